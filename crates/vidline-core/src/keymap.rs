//! Keyboard shortcuts

use crate::{playback::Command, PlayerConfig};
use serde::{Deserialize, Serialize};

/// A key as reported by the host, independent of any UI toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Char(char),
}

impl Key {
    /// Parse a DOM-style key name (`" "`, `"ArrowLeft"`, `"k"`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            " " | "Space" | "Spacebar" => Some(Key::Space),
            "ArrowLeft" | "Left" => Some(Key::ArrowLeft),
            "ArrowRight" | "Right" => Some(Key::ArrowRight),
            "ArrowUp" | "Up" => Some(Key::ArrowUp),
            "ArrowDown" | "Down" => Some(Key::ArrowDown),
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Key::Char(c.to_ascii_lowercase())),
                    _ => None,
                }
            }
        }
    }
}

/// Maps keys to playback commands using the configured steps
#[derive(Debug, Clone, PartialEq)]
pub struct Keymap {
    seek_step: f64,
    long_seek_step: f64,
    volume_step: f64,
}

impl Keymap {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            seek_step: config.seek_step,
            long_seek_step: config.long_seek_step,
            volume_step: config.volume_step,
        }
    }

    pub fn command_for(&self, key: Key) -> Option<Command> {
        let command = match key {
            Key::Space | Key::Char('k') => Command::TogglePlay,
            Key::ArrowLeft => Command::SeekBy(-self.seek_step),
            Key::ArrowRight => Command::SeekBy(self.seek_step),
            Key::Char('j') => Command::SeekBy(-self.long_seek_step),
            Key::Char('l') => Command::SeekBy(self.long_seek_step),
            Key::ArrowUp => Command::AdjustVolume(self.volume_step),
            Key::ArrowDown => Command::AdjustVolume(-self.volume_step),
            Key::Char('m') => Command::ToggleMute,
            Key::Char('f') => Command::ToggleFullscreen,
            Key::Char('i') => Command::TogglePictureInPicture,
            Key::Char('n') => Command::Next,
            Key::Char('p') => Command::Previous,
            Key::Char(_) => return None,
        };
        Some(command)
    }

    /// Shortcut for a DOM-style key name
    pub fn command_for_name(&self, name: &str) -> Option<Command> {
        Key::from_name(name).and_then(|key| self.command_for(key))
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new(&PlayerConfig::default())
    }
}
