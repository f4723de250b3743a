//! Crossfade between two slots.
//!
//! [`TransitionMachine`] is the pure part: it consumes calls and events and
//! answers with [`Effect`]s. [`TransitionController`] owns the surface, the
//! fade timer and the completion sender, performs those effects, and feeds
//! load reports and timer expiries back in as [`TransitionEvent`]s.
//!
//! Every load and timer carries the ticket of the transition that started
//! it, so a report arriving after that transition was cancelled is dropped
//! instead of animating the wrong image.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::host::SlotSurface;

/// Z-order of the visible slot while idle.
pub const ACTIVE_Z: u8 = 1;
/// Z-order of the hidden slot while idle; it sits on top so it can fade in.
pub const INACTIVE_Z: u8 = 2;

pub type Ticket = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading { ticket: Ticket, fade: Duration },
    Fading { ticket: Ticket, fade: Duration },
}

/// Answer of [`TransitionMachine::prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadePlan {
    /// A transition is already in flight; do not start another one.
    Skip,
    /// Fade disabled: swap the source in place, no animation.
    Immediate,
    Animate(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionEvent {
    Loaded { ticket: Ticket },
    LoadFailed { ticket: Ticket, reason: String },
    FadeElapsed { ticket: Ticket },
}

impl TransitionEvent {
    pub fn ticket(&self) -> Ticket {
        match *self {
            TransitionEvent::Loaded { ticket }
            | TransitionEvent::LoadFailed { ticket, .. }
            | TransitionEvent::FadeElapsed { ticket } => ticket,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SetFade(Duration),
    Acquire {
        slot: Slot,
        source: String,
        ticket: Ticket,
    },
    Show {
        slot: Slot,
        source: String,
    },
    Opacity {
        slot: Slot,
        opacity: f32,
    },
    Order {
        slot: Slot,
        z_index: u8,
    },
    ArmTimer {
        ticket: Ticket,
        after: Duration,
    },
    DisarmTimer,
    Resolve(TransitionOutcome),
}

#[derive(Debug, Clone)]
pub struct TransitionMachine {
    phase: Phase,
    active: Slot,
    next_ticket: Ticket,
}

impl Default for TransitionMachine {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            active: Slot::A,
            next_ticket: 1,
        }
    }
}

impl TransitionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn active(&self) -> Slot {
        self.active
    }

    pub fn inactive(&self) -> Slot {
        self.active.other()
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    pub fn prepare(&self, is_manual: bool, manual_fade: Duration, fade: Duration) -> FadePlan {
        if self.is_busy() {
            return FadePlan::Skip;
        }
        let fade = if is_manual { manual_fade } else { fade };
        if fade.is_zero() {
            FadePlan::Immediate
        } else {
            FadePlan::Animate(fade)
        }
    }

    /// Visible active slot on the bottom, hidden inactive slot on top.
    pub fn canonical_layout(&self) -> Vec<Effect> {
        vec![
            Effect::Opacity {
                slot: self.active,
                opacity: 1.0,
            },
            Effect::Order {
                slot: self.active,
                z_index: ACTIVE_Z,
            },
            Effect::Opacity {
                slot: self.inactive(),
                opacity: 0.0,
            },
            Effect::Order {
                slot: self.inactive(),
                z_index: INACTIVE_Z,
            },
        ]
    }

    /// Replace the active slot's source without entering Loading/Fading.
    pub fn apply_immediately(&mut self, source: &str) -> Vec<Effect> {
        if self.is_busy() {
            return Vec::new();
        }
        let mut effects = vec![Effect::Show {
            slot: self.active,
            source: source.to_string(),
        }];
        effects.extend(self.canonical_layout());
        effects
    }

    /// Start loading `source` into the inactive slot. `None` while busy.
    pub fn begin(&mut self, source: &str, fade: Duration) -> Option<(Ticket, Vec<Effect>)> {
        if self.is_busy() {
            return None;
        }
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.phase = Phase::Loading { ticket, fade };
        Some((
            ticket,
            vec![
                Effect::SetFade(fade),
                Effect::Acquire {
                    slot: self.inactive(),
                    source: source.to_string(),
                    ticket,
                },
            ],
        ))
    }

    pub fn on_event(&mut self, event: &TransitionEvent) -> Vec<Effect> {
        match (self.phase, event) {
            (Phase::Loading { ticket, fade }, TransitionEvent::Loaded { ticket: t }) if ticket == *t => {
                self.phase = Phase::Fading { ticket, fade };
                vec![
                    Effect::Opacity {
                        slot: self.inactive(),
                        opacity: 1.0,
                    },
                    Effect::Opacity {
                        slot: self.active,
                        opacity: 0.0,
                    },
                    Effect::ArmTimer { ticket, after: fade },
                ]
            }
            (Phase::Loading { ticket, .. }, TransitionEvent::LoadFailed { ticket: t, .. })
                if ticket == *t =>
            {
                self.phase = Phase::Idle;
                vec![Effect::Resolve(TransitionOutcome::Failed)]
            }
            (Phase::Fading { ticket, .. }, TransitionEvent::FadeElapsed { ticket: t })
                if ticket == *t =>
            {
                self.active = self.active.other();
                self.phase = Phase::Idle;
                let mut effects = self.canonical_layout();
                effects.push(Effect::Resolve(TransitionOutcome::Completed));
                effects
            }
            _ => Vec::new(),
        }
    }

    pub fn cancel(&mut self) -> Vec<Effect> {
        if !self.is_busy() {
            return Vec::new();
        }
        self.phase = Phase::Idle;
        let mut effects = vec![Effect::DisarmTimer];
        effects.extend(self.canonical_layout());
        effects.push(Effect::Resolve(TransitionOutcome::Cancelled));
        effects
    }
}

/// Single-use handle for one transition's end.
pub struct Completion {
    ticket: Ticket,
    rx: oneshot::Receiver<TransitionOutcome>,
}

impl Completion {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Outcome if the transition already ended, without waiting.
    pub fn try_outcome(&mut self) -> Option<TransitionOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(TransitionOutcome::Cancelled),
        }
    }
}

impl Future for Completion {
    type Output = TransitionOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped controller cannot finish the fade; treat it as cancelled.
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(TransitionOutcome::Cancelled))
    }
}

/// Handed to the surface with each load; reports exactly once.
///
/// Dropping it without reporting counts as a failed load, so a surface that
/// loses the reporter cannot leave the transition stuck in `Loading`.
#[derive(Debug)]
pub struct LoadReporter {
    ticket: Ticket,
    tx: Option<mpsc::UnboundedSender<TransitionEvent>>,
}

impl LoadReporter {
    pub fn new(ticket: Ticket, tx: mpsc::UnboundedSender<TransitionEvent>) -> Self {
        Self {
            ticket,
            tx: Some(tx),
        }
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn loaded(mut self) {
        self.send(TransitionEvent::Loaded {
            ticket: self.ticket,
        });
    }

    pub fn failed(mut self, reason: impl Into<String>) {
        self.send(TransitionEvent::LoadFailed {
            ticket: self.ticket,
            reason: reason.into(),
        });
    }

    fn send(&mut self, event: TransitionEvent) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(event);
        }
    }
}

impl Drop for LoadReporter {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.send(TransitionEvent::LoadFailed {
                ticket: self.ticket,
                reason: "load abandoned".into(),
            });
        }
    }
}

pub struct TransitionController<S> {
    machine: TransitionMachine,
    surface: S,
    events_tx: mpsc::UnboundedSender<TransitionEvent>,
    timer: Option<CancellationToken>,
    completion: Option<oneshot::Sender<TransitionOutcome>>,
}

impl<S: SlotSurface> TransitionController<S> {
    pub fn new(surface: S, events_tx: mpsc::UnboundedSender<TransitionEvent>) -> Self {
        let mut controller = Self {
            machine: TransitionMachine::new(),
            surface,
            events_tx,
            timer: None,
            completion: None,
        };
        let layout = controller.machine.canonical_layout();
        controller.apply(layout);
        controller
    }

    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    pub fn active_slot(&self) -> Slot {
        self.machine.active()
    }

    pub fn is_busy(&self) -> bool {
        self.machine.is_busy()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn prepare(&self, is_manual: bool, manual_fade: Duration, fade: Duration) -> FadePlan {
        let plan = self.machine.prepare(is_manual, manual_fade, fade);
        if plan == FadePlan::Skip {
            debug!("skipping transition (already in progress)");
        }
        plan
    }

    pub fn apply_immediately(&mut self, source: &str) {
        debug!(source, "applying image without transition");
        let effects = self.machine.apply_immediately(source);
        self.apply(effects);
    }

    pub fn begin(&mut self, source: &str, fade: Duration) -> Option<Completion> {
        let (ticket, effects) = self.machine.begin(source, fade)?;
        let (tx, rx) = oneshot::channel();
        self.completion = Some(tx);
        info!(ticket, source, fade_ms = fade.as_millis() as u64, "loading image");
        self.apply(effects);
        Some(Completion { ticket, rx })
    }

    pub fn handle_event(&mut self, event: TransitionEvent) {
        if let TransitionEvent::LoadFailed { ticket, reason } = &event {
            warn!(ticket, reason = %reason, "failed to load image");
        }
        let effects = self.machine.on_event(&event);
        if effects.is_empty() {
            debug!(
                ticket = event.ticket(),
                phase = ?self.machine.phase(),
                "ignoring stale transition event"
            );
            return;
        }
        self.apply(effects);
    }

    /// Abort an in-flight transition. Returns false when idle.
    pub fn cancel(&mut self) -> bool {
        let effects = self.machine.cancel();
        if effects.is_empty() {
            return false;
        }
        debug!("cancelled ongoing transition");
        self.apply(effects);
        true
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SetFade(fade) => self.surface.set_fade(fade),
                Effect::Acquire {
                    slot,
                    source,
                    ticket,
                } => {
                    let reporter = LoadReporter::new(ticket, self.events_tx.clone());
                    self.surface.acquire(slot, &source, reporter);
                }
                Effect::Show { slot, source } => self.surface.show(slot, &source),
                Effect::Opacity { slot, opacity } => self.surface.set_opacity(slot, opacity),
                Effect::Order { slot, z_index } => self.surface.set_order(slot, z_index),
                Effect::ArmTimer { ticket, after } => self.arm_timer(ticket, after),
                Effect::DisarmTimer => {
                    if let Some(timer) = self.timer.take() {
                        timer.cancel();
                    }
                }
                Effect::Resolve(outcome) => {
                    self.timer.take();
                    match self.completion.take() {
                        Some(tx) => {
                            debug!(?outcome, "transition finished");
                            let _ = tx.send(outcome);
                        }
                        None => warn!(?outcome, "transition finished without a waiter"),
                    }
                }
            }
        }
    }

    fn arm_timer(&mut self, ticket: Ticket, after: Duration) {
        let token = CancellationToken::new();
        let disarmed = token.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = disarmed.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    let _ = tx.send(TransitionEvent::FadeElapsed { ticket });
                }
            }
        });
        if let Some(previous) = self.timer.replace(token) {
            previous.cancel();
        }
    }
}

impl<S> Drop for TransitionController<S> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}
