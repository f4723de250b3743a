use std::time::Duration;

use tracing::{debug, info};

use crate::slideshow::buttons::NavButton;
use crate::slideshow::host::{NavControls, SlotSurface};
use crate::slideshow::transition::{LoadReporter, Slot};
use crate::tasks::loader;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotView {
    pub source: Option<String>,
    pub opacity: f32,
    pub z_index: u8,
}

/// Two-slot surface without a display: tracks what each slot would show and
/// validates loads through the loader.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    slots: [SlotView; 2],
    fade: Duration,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, slot: Slot) -> &SlotView {
        &self.slots[index(slot)]
    }

    pub fn fade(&self) -> Duration {
        self.fade
    }

    /// Source of the topmost slot that is at least partly opaque.
    pub fn visible(&self) -> Option<&str> {
        self.slots
            .iter()
            .filter(|view| view.opacity > 0.0)
            .max_by_key(|view| view.z_index)
            .and_then(|view| view.source.as_deref())
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut SlotView {
        &mut self.slots[index(slot)]
    }
}

fn index(slot: Slot) -> usize {
    match slot {
        Slot::A => 0,
        Slot::B => 1,
    }
}

impl SlotSurface for HeadlessSurface {
    fn acquire(&mut self, slot: Slot, source: &str, reporter: LoadReporter) {
        debug!(?slot, source, ticket = reporter.ticket(), "acquiring image");
        self.slot_mut(slot).source = Some(source.to_string());
        loader::spawn_probe(source.to_string(), reporter);
    }

    fn show(&mut self, slot: Slot, source: &str) {
        info!(?slot, source, "displaying");
        self.slot_mut(slot).source = Some(source.to_string());
    }

    fn set_opacity(&mut self, slot: Slot, opacity: f32) {
        let view = self.slot_mut(slot);
        if opacity >= 1.0 && view.opacity < 1.0 {
            if let Some(source) = view.source.as_deref() {
                info!(?slot, source, "displaying");
            }
        }
        view.opacity = opacity;
    }

    fn set_order(&mut self, slot: Slot, z_index: u8) {
        self.slot_mut(slot).z_index = z_index;
    }

    fn set_fade(&mut self, fade: Duration) {
        self.fade = fade;
    }
}

/// Navigation buttons that only log their visibility changes.
#[derive(Debug, Default)]
pub struct LogNavControls {
    previous: bool,
    next: bool,
}

impl LogNavControls {
    pub fn is_visible(&self, button: NavButton) -> bool {
        match button {
            NavButton::Previous => self.previous,
            NavButton::Next => self.next,
        }
    }
}

impl NavControls for LogNavControls {
    fn set_visibility(&mut self, button: NavButton, visible: bool) {
        let flag = match button {
            NavButton::Previous => &mut self.previous,
            NavButton::Next => &mut self.next,
        };
        if *flag != visible {
            *flag = visible;
            info!(?button, visible, "navigation button");
        }
    }
}
