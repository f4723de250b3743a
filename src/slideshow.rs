//! Navigation engine: history, selection, crossfade and the façade tying them together.

pub mod buttons;
pub mod host;
pub mod ledger;
pub mod navigator;
pub mod selection;
pub mod state;
pub mod transition;

pub use buttons::NavButton;
pub use host::{CandidateListing, CandidateSource, NavControls, SlotSurface, SourceResolver};
pub use ledger::HistoryLedger;
pub use navigator::{NavOutcome, RefreshOutcome, Render, RenderOrigin, Slideshow};
pub use selection::Pick;
pub use state::SlideshowState;
pub use transition::{LoadReporter, Phase, Slot, TransitionEvent, TransitionOutcome};
