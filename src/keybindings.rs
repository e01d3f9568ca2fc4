// Keybinding table
// Maps keyboard symbols to coordinator events

use crate::coordinator::{Direction, Event};
use smithay_client_toolkit::seat::keyboard::Keysym;
use std::fmt::Write;

/// One entry of the keybinding table
pub struct KeyBinding {
    pub keysym: Keysym,
    /// Key sequence as shown to the user
    pub key: &'static str,
    pub description: &'static str,
    pub action: Action,
}

/// What a key does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Previous,
    Next,
    ResizeToFit,
    Pan(Direction),
    Quit,
}

impl Action {
    pub fn event(self) -> Event {
        match self {
            Action::Previous => Event::Previous,
            Action::Next => Event::Next,
            Action::ResizeToFit => Event::ResizeToFit,
            Action::Pan(direction) => Event::StepPan(direction),
            Action::Quit => Event::Quit,
        }
    }
}

pub const KEYBINDINGS: &[KeyBinding] = &[
    KeyBinding {
        keysym: Keysym::Left,
        key: "left",
        description: "Cycle to the previous image.",
        action: Action::Previous,
    },
    KeyBinding {
        keysym: Keysym::Right,
        key: "right",
        description: "Cycle to the next image.",
        action: Action::Next,
    },
    KeyBinding {
        keysym: Keysym::H,
        key: "shift-h",
        description: "Cycle to the previous image.",
        action: Action::Previous,
    },
    KeyBinding {
        keysym: Keysym::L,
        key: "shift-l",
        description: "Cycle to the next image.",
        action: Action::Next,
    },
    KeyBinding {
        keysym: Keysym::r,
        key: "r",
        description: "Resize the window to fit the current image.",
        action: Action::ResizeToFit,
    },
    KeyBinding {
        keysym: Keysym::h,
        key: "h",
        description: "Pan left.",
        action: Action::Pan(Direction::Left),
    },
    KeyBinding {
        keysym: Keysym::j,
        key: "j",
        description: "Pan down.",
        action: Action::Pan(Direction::Down),
    },
    KeyBinding {
        keysym: Keysym::k,
        key: "k",
        description: "Pan up.",
        action: Action::Pan(Direction::Up),
    },
    KeyBinding {
        keysym: Keysym::l,
        key: "l",
        description: "Pan right.",
        action: Action::Pan(Direction::Right),
    },
    KeyBinding {
        keysym: Keysym::q,
        key: "q",
        description: "Quit.",
        action: Action::Quit,
    },
    KeyBinding {
        keysym: Keysym::Escape,
        key: "escape",
        description: "Quit.",
        action: Action::Quit,
    },
];

/// Event bound to a key, if any
pub fn lookup(keysym: Keysym) -> Option<Event> {
    KEYBINDINGS
        .iter()
        .find(|binding| binding.keysym == keysym)
        .map(|binding| binding.action.event())
}

/// Human readable listing of every binding, one per line
pub fn describe() -> String {
    let mut out = String::new();
    for binding in KEYBINDINGS {
        let _ = writeln!(out, "{:<10} {}", binding.key, binding.description);
    }
    let _ = writeln!(out, "{:<10} {}", "mouse", "Left mouse button will pan the image.");
    out
}
