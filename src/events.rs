/// Emitted by the host on every state change it wants the slideshow to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    /// Towards the most recent entry (cursor decreases).
    Next,
    /// Towards older entries (cursor increases).
    Previous,
}

/// User input routed to the slideshow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    Navigate(NavDirection),
    PointerEnter,
    PointerLeave,
    Touch,
}

impl NavCommand {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "n" | "next" => Some(Self::Navigate(NavDirection::Next)),
            "p" | "prev" | "previous" => Some(Self::Navigate(NavDirection::Previous)),
            "enter" => Some(Self::PointerEnter),
            "leave" => Some(Self::PointerLeave),
            "touch" => Some(Self::Touch),
            _ => None,
        }
    }
}
