use std::time::Duration;

use anyhow::Result as AnyResult;
use rand::rngs::StdRng;
use tokio::select;
use tokio::sync::mpsc::{self, Receiver, UnboundedReceiver};
use tokio::time::{Instant, sleep_until, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::buttons::NavButtons;
use super::host::{CandidateListing, CandidateSource, NavControls, SlotSurface, SourceResolver};
use super::selection::{self, Pick};
use super::state::SlideshowState;
use super::transition::{
    Completion, FadePlan, Phase, TransitionController, TransitionEvent, TransitionOutcome,
};
use crate::config::{SlideshowOptions, TOUCH_REVEAL};
use crate::error::{Result, SlideshowError};
use crate::events::{NavCommand, NavDirection, RefreshSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOrigin {
    Automatic,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    /// Fade disabled; the image was applied synchronously.
    Immediate,
    /// A crossfade was started and is tracked as the pending render.
    Animated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A render is pending or the interval has not elapsed yet.
    NotDue,
    /// The transition controller was busy; nothing was committed.
    InFlight,
    Rendered { pick: Pick, render: Render },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// Already at the end of history in that direction.
    Ignored,
    Rendered { index: usize, render: Render },
}

struct PendingRender {
    completion: Completion,
    origin: RenderOrigin,
}

/// Entry point of the navigation engine.
///
/// Owns the committed [`SlideshowState`], the transition controller and the
/// navigation buttons. Refresh signals and manual navigation both run the
/// same pipeline on a snapshot (refresh, select, resolve, transition) and
/// commit the snapshot only once a transition was actually issued.
///
/// The pending render doubles as the re-entrancy guard for the automatic
/// path: it only exists between issuing a crossfade and that crossfade's
/// completion, so an error anywhere earlier leaves nothing to release.
pub struct Slideshow<C, R, S, N> {
    options: SlideshowOptions,
    source: C,
    resolver: R,
    controller: TransitionController<S>,
    buttons: NavButtons<N>,
    events_rx: UnboundedReceiver<TransitionEvent>,
    state: SlideshowState,
    last_update: Option<Instant>,
    pending: Option<PendingRender>,
    rng: StdRng,
}

impl<C, R, S, N> Slideshow<C, R, S, N>
where
    C: CandidateSource,
    R: SourceResolver,
    S: SlotSurface,
    N: NavControls,
{
    pub fn new(
        options: SlideshowOptions,
        source: C,
        resolver: R,
        surface: S,
        controls: N,
        rng: StdRng,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let last_update = if options.start_immediately {
            None
        } else {
            debug!("start immediately is disabled; skipping first update interval");
            Some(Instant::now())
        };
        Self {
            controller: TransitionController::new(surface, events_tx),
            buttons: NavButtons::new(controls, TOUCH_REVEAL),
            options,
            source,
            resolver,
            events_rx,
            state: SlideshowState::default(),
            last_update,
            pending: None,
            rng,
        }
    }

    pub fn options(&self) -> &SlideshowOptions {
        &self.options
    }

    pub fn state(&self) -> &SlideshowState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    pub fn surface(&self) -> &S {
        self.controller.surface()
    }

    pub fn controls(&self) -> &N {
        self.buttons.controls()
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    pub fn is_update_in_progress(&self) -> bool {
        self.pending.is_some()
    }

    pub fn snapshot(&self) -> SlideshowState {
        self.state.snapshot()
    }

    pub fn commit(&mut self, snapshot: SlideshowState) {
        if self.state.commit(snapshot) {
            debug!(
                candidates = self.state.candidate_count(),
                history = ?self.state.ledger.to_vec(),
                offset = self.state.ledger.offset(),
                "state committed"
            );
        }
        self.buttons.update(&self.state.ledger);
    }

    /// Whether a refresh signal received at `now` would run the pipeline.
    pub fn is_due(&self, now: Instant) -> bool {
        if self.pending.is_some() {
            return false;
        }
        match self.last_update {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.options.interval,
        }
    }

    /// Handle one host refresh signal.
    pub async fn on_refresh_signal(&mut self) -> Result<RefreshOutcome> {
        if !self.is_due(Instant::now()) {
            return Ok(RefreshOutcome::NotDue);
        }

        let listing = read_listing(&self.source, self.options.source_timeout).await?;
        let mut snapshot = selection::refresh(
            self.state.snapshot(),
            listing,
            &self.options.file_filter,
            self.options.mode,
            &mut self.rng,
        );
        let candidate_count = snapshot.candidate_count();
        let pick = selection::pick_next(
            &mut snapshot.ledger,
            candidate_count,
            self.options.mode,
            self.options.max_history,
            &mut self.rng,
        )?;
        let identifier = snapshot
            .current_id()
            .ok_or(SlideshowError::EmptyCandidateSet)?
            .to_string();
        let address =
            resolve_address(&self.resolver, &identifier, self.options.source_timeout).await?;

        let render = match self.start_render(&address, RenderOrigin::Automatic) {
            Some(render) => render,
            None => return Ok(RefreshOutcome::InFlight),
        };
        info!(
            index = pick.index(),
            identifier = %identifier,
            ?render,
            "showing next image"
        );
        self.commit(snapshot);
        Ok(RefreshOutcome::Rendered { pick, render })
    }

    /// Handle a user request to step through history.
    pub async fn on_manual_navigate(&mut self, direction: NavDirection) -> Result<NavOutcome> {
        let mut snapshot = self.state.snapshot();
        let moved = match direction {
            NavDirection::Next => snapshot.ledger.step_forward(),
            NavDirection::Previous => snapshot.ledger.step_back(),
        };
        if !moved {
            debug!(?direction, offset = snapshot.ledger.offset(), "nothing to navigate to");
            self.buttons.reveal(&self.state.ledger);
            return Ok(NavOutcome::Ignored);
        }

        self.cancel_in_flight();

        let index = snapshot
            .ledger
            .current()
            .ok_or(SlideshowError::EmptyCandidateSet)?;
        let identifier = snapshot
            .current_id()
            .ok_or(SlideshowError::EmptyCandidateSet)?
            .to_string();
        let address =
            match resolve_address(&self.resolver, &identifier, self.options.source_timeout).await {
                Ok(address) => address,
                Err(err) => {
                    self.buttons.reveal(&self.state.ledger);
                    return Err(err);
                }
            };

        let Some(render) = self.start_render(&address, RenderOrigin::Manual) else {
            return Ok(NavOutcome::Ignored);
        };
        info!(
            ?direction,
            offset = snapshot.ledger.offset(),
            identifier = %identifier,
            "manual navigation"
        );
        self.commit(snapshot);
        self.last_update = Some(Instant::now() + self.options.manual_delay);
        self.buttons.reveal(&self.state.ledger);
        Ok(NavOutcome::Rendered { index, render })
    }

    /// Route a load report or fade timer expiry into the transition controller.
    pub fn handle_transition_event(&mut self, event: TransitionEvent) {
        self.controller.handle_event(event);
        self.settle_pending();
    }

    /// Process every transition event that is already queued. Returns how many ran.
    pub fn drain_transition_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_transition_event(event);
            handled += 1;
        }
        handled
    }

    pub async fn on_command(&mut self, command: NavCommand) {
        match command {
            NavCommand::Navigate(direction) => {
                if let Err(err) = self.on_manual_navigate(direction).await {
                    warn!(error = %err, ?direction, "manual navigation failed");
                }
            }
            NavCommand::PointerEnter => self.buttons.reveal(&self.state.ledger),
            NavCommand::PointerLeave => self.buttons.hide(&self.state.ledger),
            NavCommand::Touch => self.buttons.touch(&self.state.ledger, Instant::now()),
        }
    }

    /// Hide touch-revealed buttons once their deadline passed.
    pub fn on_hide_deadline(&mut self) {
        self.buttons.expire(&self.state.ledger, Instant::now());
    }

    /// Cancel whatever is in flight and hide the controls.
    pub fn shutdown(&mut self) {
        self.cancel_in_flight();
        self.buttons.hide(&self.state.ledger);
        info!("slideshow stopped");
    }

    /// Drive the slideshow until `cancel` fires.
    pub async fn run(
        mut self,
        mut signals: Receiver<RefreshSignal>,
        mut commands: Receiver<NavCommand>,
        cancel: CancellationToken,
    ) -> AnyResult<()> {
        let mut signals_open = true;
        let mut commands_open = true;

        loop {
            let hide_at = self.buttons.hide_at();
            select! {
                _ = cancel.cancelled() => break,

                Some(event) = self.events_rx.recv() => {
                    self.handle_transition_event(event);
                }

                _ = sleep_until(hide_at.unwrap_or_else(Instant::now)), if hide_at.is_some() => {
                    self.on_hide_deadline();
                }

                maybe_signal = signals.recv(), if signals_open => match maybe_signal {
                    Some(RefreshSignal) => {
                        if let Err(err) = self.on_refresh_signal().await {
                            warn!(error = %err, "error while updating slideshow");
                        }
                    }
                    None => {
                        debug!("refresh signal source closed");
                        signals_open = false;
                    }
                },

                maybe_cmd = commands.recv(), if commands_open => match maybe_cmd {
                    Some(cmd) => self.on_command(cmd).await,
                    None => {
                        debug!("navigation command source closed");
                        commands_open = false;
                    }
                },
            }
        }

        self.shutdown();
        Ok(())
    }

    fn start_render(&mut self, address: &str, origin: RenderOrigin) -> Option<Render> {
        let is_manual = origin == RenderOrigin::Manual;
        match self
            .controller
            .prepare(is_manual, self.options.manual_fade, self.options.fade)
        {
            FadePlan::Skip => None,
            FadePlan::Immediate => {
                self.controller.apply_immediately(address);
                if origin == RenderOrigin::Automatic {
                    self.last_update = Some(Instant::now());
                }
                Some(Render::Immediate)
            }
            FadePlan::Animate(fade) => {
                let completion = self.controller.begin(address, fade)?;
                self.pending = Some(PendingRender { completion, origin });
                Some(Render::Animated)
            }
        }
    }

    fn cancel_in_flight(&mut self) {
        if self.controller.cancel() {
            self.settle_pending();
        }
    }

    fn settle_pending(&mut self) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        let Some(outcome) = pending.completion.try_outcome() else {
            return;
        };
        let origin = pending.origin;
        let ticket = pending.completion.ticket();
        self.pending = None;

        match outcome {
            TransitionOutcome::Completed => {
                let now = Instant::now();
                // A manual navigation may have pushed the stamp into the future.
                self.last_update = Some(self.last_update.map_or(now, |last| last.max(now)));
                debug!(ticket, ?origin, "transition completed");
            }
            TransitionOutcome::Failed => {
                warn!(ticket, ?origin, "transition failed; keeping the current image");
            }
            TransitionOutcome::Cancelled => {
                debug!(ticket, ?origin, "transition cancelled");
            }
        }
    }
}

async fn read_listing<C: CandidateSource>(source: &C, limit: Duration) -> Result<CandidateListing> {
    match timeout(limit, source.read_candidates()).await {
        Ok(listing) => listing,
        Err(_) => Err(SlideshowError::SourceUnavailable(format!(
            "no answer within {}",
            humantime::format_duration(limit)
        ))),
    }
}

async fn resolve_address<R: SourceResolver>(
    resolver: &R,
    identifier: &str,
    limit: Duration,
) -> Result<String> {
    debug!(identifier, "resolving image address");
    match timeout(limit, resolver.resolve(identifier)).await {
        Ok(address) => address,
        Err(_) => Err(SlideshowError::ResolutionFailed {
            id: identifier.to_string(),
            reason: format!("no answer within {}", humantime::format_duration(limit)),
        }),
    }
}
