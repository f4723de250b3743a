//! Capabilities the host environment supplies to the slideshow.

use std::future::Future;
use std::time::Duration;

use super::buttons::NavButton;
use super::transition::{LoadReporter, Slot};
use crate::error::Result;

/// Raw candidate identifiers plus the token that changes whenever they do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateListing {
    pub items: Vec<String>,
    pub change_token: String,
}

pub trait CandidateSource: Send + Sync {
    /// Fails with `SourceUnavailable` when the source cannot be read.
    fn read_candidates(&self) -> impl Future<Output = Result<CandidateListing>> + Send;
}

pub trait SourceResolver: Send + Sync {
    /// Turn an opaque identifier into an address the surface can load.
    /// Fails with `ResolutionFailed` for unknown identifiers.
    fn resolve(&self, identifier: &str) -> impl Future<Output = Result<String>> + Send;
}

/// The two rendering slots used for crossfading.
///
/// Only the transition controller talks to a surface.
pub trait SlotSurface: Send {
    /// Start fetching `source` into `slot`; report the outcome through `reporter`.
    fn acquire(&mut self, slot: Slot, source: &str, reporter: LoadReporter);
    /// Put `source` into `slot` without waiting for a load notification.
    fn show(&mut self, slot: Slot, source: &str);
    fn set_opacity(&mut self, slot: Slot, opacity: f32);
    fn set_order(&mut self, slot: Slot, z_index: u8);
    /// Duration of the opacity animation applied to both slots.
    fn set_fade(&mut self, fade: Duration);
}

pub trait NavControls: Send {
    fn set_visibility(&mut self, button: NavButton, visible: bool);
}
