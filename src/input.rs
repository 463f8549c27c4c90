//! Keyboard handling for the windowed runner.
//!
//! Raw winit key events are folded into [`Command`]s. A command fires once
//! when its key goes down; OS key repeat does not toggle it again.

use std::collections::HashSet;

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Something the user asked for from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `Escape`: leave the run loop.
    Quit,
    /// `M`: mirror each rotation.
    ToggleMirror,
    /// `A`: show attractor guides.
    ToggleAttractors,
    /// `T`: trail lines.
    ToggleTrail,
}

impl Command {
    /// The command bound to `key`, if any.
    pub fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::Escape => Some(Command::Quit),
            KeyCode::KeyM => Some(Command::ToggleMirror),
            KeyCode::KeyA => Some(Command::ToggleAttractors),
            KeyCode::KeyT => Some(Command::ToggleTrail),
            _ => None,
        }
    }
}

/// Tracks held keys so that a held key fires its command once.
#[derive(Debug, Default)]
pub struct Input {
    keys_held: HashSet<KeyCode>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently held down.
    pub fn key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Process a winit keyboard event.
    pub fn handle_key_event(&mut self, event: &KeyEvent) -> Option<Command> {
        match event.physical_key {
            PhysicalKey::Code(key) => self.handle_key(key, event.state),
            PhysicalKey::Unidentified(_) => None,
        }
    }

    /// Record a key transition; returns the command on a fresh press.
    pub fn handle_key(&mut self, key: KeyCode, state: ElementState) -> Option<Command> {
        match state {
            ElementState::Pressed => {
                if self.keys_held.insert(key) {
                    Command::from_key(key)
                } else {
                    None
                }
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
                None
            }
        }
    }

    /// Forget held keys, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.keys_held.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings() {
        assert_eq!(Command::from_key(KeyCode::Escape), Some(Command::Quit));
        assert_eq!(Command::from_key(KeyCode::KeyM), Some(Command::ToggleMirror));
        assert_eq!(Command::from_key(KeyCode::KeyA), Some(Command::ToggleAttractors));
        // Glow belongs to the quality controller.
        assert_eq!(Command::from_key(KeyCode::KeyG), None);
        assert_eq!(Command::from_key(KeyCode::KeyT), Some(Command::ToggleTrail));
        assert_eq!(Command::from_key(KeyCode::Space), None);
    }

    #[test]
    fn test_repeat_fires_once() {
        let mut input = Input::new();
        assert_eq!(
            input.handle_key(KeyCode::KeyM, ElementState::Pressed),
            Some(Command::ToggleMirror)
        );
        assert!(input.key_held(KeyCode::KeyM));
        // OS key repeat
        assert_eq!(input.handle_key(KeyCode::KeyM, ElementState::Pressed), None);
        assert_eq!(input.handle_key(KeyCode::KeyM, ElementState::Released), None);
        assert!(!input.key_held(KeyCode::KeyM));
        assert_eq!(
            input.handle_key(KeyCode::KeyM, ElementState::Pressed),
            Some(Command::ToggleMirror)
        );
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut input = Input::new();
        input.handle_key(KeyCode::KeyT, ElementState::Pressed);
        input.clear();
        assert_eq!(
            input.handle_key(KeyCode::KeyT, ElementState::Pressed),
            Some(Command::ToggleTrail)
        );
    }
}
