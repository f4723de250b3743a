use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use super::host::NavControls;
use super::ledger::HistoryLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavButton {
    Previous,
    Next,
}

/// Which buttons may be shown for the given history position.
///
/// "Previous" needs an older entry behind the cursor, "next" a newer one in
/// front of it.
pub fn visibility(ledger: &HistoryLedger, revealed: bool) -> (bool, bool) {
    if !revealed {
        return (false, false);
    }
    let last = ledger.len().saturating_sub(1);
    (ledger.offset() != last, ledger.offset() != 0)
}

/// Previous/next buttons: reveal on hover or touch, hide on leave or after a
/// touch timeout.
pub struct NavButtons<N> {
    controls: N,
    revealed: bool,
    hide_at: Option<Instant>,
    touch_reveal: Duration,
}

impl<N: NavControls> NavButtons<N> {
    pub fn new(mut controls: N, touch_reveal: Duration) -> Self {
        controls.set_visibility(NavButton::Previous, false);
        controls.set_visibility(NavButton::Next, false);
        Self {
            controls,
            revealed: false,
            hide_at: None,
            touch_reveal,
        }
    }

    pub fn controls(&self) -> &N {
        &self.controls
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Deadline of the touch auto-hide, if armed.
    pub fn hide_at(&self) -> Option<Instant> {
        self.hide_at
    }

    pub fn reveal(&mut self, ledger: &HistoryLedger) {
        self.revealed = true;
        self.update(ledger);
    }

    pub fn hide(&mut self, ledger: &HistoryLedger) {
        self.revealed = false;
        self.hide_at = None;
        self.update(ledger);
    }

    /// Reveal now and (re)arm the auto-hide deadline.
    pub fn touch(&mut self, ledger: &HistoryLedger, now: Instant) {
        self.hide_at = Some(now + self.touch_reveal);
        self.reveal(ledger);
    }

    /// Hide if the touch deadline has passed. Returns true when it fired.
    pub fn expire(&mut self, ledger: &HistoryLedger, now: Instant) -> bool {
        match self.hide_at {
            Some(deadline) if deadline <= now => {
                self.hide(ledger);
                true
            }
            _ => false,
        }
    }

    pub fn update(&mut self, ledger: &HistoryLedger) {
        let (previous, next) = visibility(ledger, self.revealed);
        trace!(previous, next, offset = ledger.offset(), "navigation buttons");
        self.controls.set_visibility(NavButton::Previous, previous);
        self.controls.set_visibility(NavButton::Next, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Recorder(HashMap<NavButton, bool>);

    impl NavControls for Recorder {
        fn set_visibility(&mut self, button: NavButton, visible: bool) {
            self.0.insert(button, visible);
        }
    }

    fn shown(buttons: &NavButtons<Recorder>) -> (bool, bool) {
        let map = &buttons.controls().0;
        (map[&NavButton::Previous], map[&NavButton::Next])
    }

    #[test]
    fn visibility_tracks_cursor_position() {
        let newest = HistoryLedger::from_entries([0, 1, 2], 0);
        let middle = HistoryLedger::from_entries([0, 1, 2], 1);
        let oldest = HistoryLedger::from_entries([0, 1, 2], 2);
        assert_eq!(visibility(&newest, true), (true, false));
        assert_eq!(visibility(&middle, true), (true, true));
        assert_eq!(visibility(&oldest, true), (false, true));
        assert_eq!(visibility(&middle, false), (false, false));
    }

    #[test]
    fn single_entry_history_shows_nothing() {
        let ledger = HistoryLedger::from_entries([4], 0);
        assert_eq!(visibility(&ledger, true), (false, false));
    }

    #[test]
    fn hover_reveals_and_leave_hides() {
        let ledger = HistoryLedger::from_entries([0, 1], 0);
        let mut buttons = NavButtons::new(Recorder::default(), Duration::from_millis(2500));
        assert_eq!(shown(&buttons), (false, false));
        buttons.reveal(&ledger);
        assert_eq!(shown(&buttons), (true, false));
        buttons.hide(&ledger);
        assert_eq!(shown(&buttons), (false, false));
    }

    #[test]
    fn touch_auto_hide_is_rearmed() {
        let ledger = HistoryLedger::from_entries([0, 1], 1);
        let mut buttons = NavButtons::new(Recorder::default(), Duration::from_millis(2500));
        let t0 = Instant::now();
        buttons.touch(&ledger, t0);
        assert_eq!(shown(&buttons), (false, true));

        buttons.touch(&ledger, t0 + Duration::from_millis(2000));
        assert!(!buttons.expire(&ledger, t0 + Duration::from_millis(3000)));
        assert!(buttons.is_revealed());

        assert!(buttons.expire(&ledger, t0 + Duration::from_millis(4500)));
        assert_eq!(shown(&buttons), (false, false));
        assert_eq!(buttons.hide_at(), None);
    }
}
