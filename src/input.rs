use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use winit::keyboard::{Key, NamedKey as WinitNamedKey};

use crate::camera::Movement;

/// Identifier for a keyboard key, as produced by the active layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
}

impl KeyCode {
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if ch.is_ascii_alphanumeric() => {
                Some(Self::Character(ch.to_ascii_uppercase()))
            }
            _ => None,
        }
    }

    /// Translates a winit logical key; keys the playground never binds map
    /// to `None`.
    pub fn from_winit(key: &Key) -> Option<Self> {
        match key {
            Key::Character(text) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Some(Self::Character(ch.to_ascii_uppercase())),
                    _ => None,
                }
            }
            Key::Named(named) => {
                let key = match named {
                    WinitNamedKey::ArrowLeft => NamedKey::Left,
                    WinitNamedKey::ArrowRight => NamedKey::Right,
                    WinitNamedKey::ArrowUp => NamedKey::Up,
                    WinitNamedKey::ArrowDown => NamedKey::Down,
                    WinitNamedKey::Space => NamedKey::Space,
                    WinitNamedKey::Escape => NamedKey::Escape,
                    WinitNamedKey::Shift => NamedKey::Shift,
                    WinitNamedKey::Control => NamedKey::Control,
                    _ => return None,
                };
                Some(Self::Named(key))
            }
            _ => None,
        }
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Space" => Space,
        "Left" => Left,
        "Right" => Right,
        "Up" => Up,
        "Down" => Down,
        "Escape" | "Esc" => Escape,
        "Shift" => Shift,
        "Ctrl" | "Control" => Control,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

/// Friendly names for the non-character keys the playground reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Shift,
    Control,
}

/// Held keys and mouse motion gathered between two ticks.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    keys: HashSet<KeyCode>,
    mouse_position: Vec2,
    mouse_delta: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&mut self, key: KeyCode) {
        self.keys.insert(key);
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    pub fn set_mouse_position(&mut self, position: Vec2) {
        self.mouse_position = position;
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Accumulates relative mouse motion until the next `take_mouse_delta`.
    pub fn add_mouse_delta(&mut self, delta: Vec2) {
        self.mouse_delta += delta;
    }

    pub fn take_mouse_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.mouse_delta)
    }

    /// Releases every key, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.mouse_delta = Vec2::ZERO;
    }
}

/// One-shot actions triggered by a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    ToggleDebug,
    ToggleWireframe,
    ResetCamera,
    LookAtScene,
    ToggleMouseControls,
    ToggleNullCamera,
}

/// Maps held keys to camera movements and pressed keys to commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBindings {
    movements: Vec<(KeyCode, Movement)>,
    commands: Vec<(KeyCode, Command)>,
}

impl KeyBindings {
    pub fn new(movements: Vec<(KeyCode, Movement)>, commands: Vec<(KeyCode, Command)>) -> Self {
        Self {
            movements,
            commands,
        }
    }

    /// Movements whose key is currently held, in binding order.
    pub fn held_movements<'a>(
        &'a self,
        input: &'a InputState,
    ) -> impl Iterator<Item = Movement> + 'a {
        self.movements
            .iter()
            .filter(|(key, _)| input.is_key_down(*key))
            .map(|(_, movement)| *movement)
    }

    pub fn command(&self, key: KeyCode) -> Option<Command> {
        self.commands
            .iter()
            .find(|(bound, _)| *bound == key)
            .map(|(_, command)| *command)
    }

    /// The key bound to `movement`, if any.
    pub fn key_for(&self, movement: Movement) -> Option<KeyCode> {
        self.movements
            .iter()
            .find(|(_, bound)| *bound == movement)
            .map(|(key, _)| *key)
    }
}

impl Default for KeyBindings {
    /// AZERTY layout: Z/S forward and back, Q/D strafe, A/E rise and sink,
    /// arrows turn and look.
    fn default() -> Self {
        use KeyCode::{Character, Named};
        Self::new(
            vec![
                (Character('Z'), Movement::Forward),
                (Character('S'), Movement::Backward),
                (Character('Q'), Movement::StrafeLeft),
                (Character('D'), Movement::StrafeRight),
                (Character('A'), Movement::StrafeUp),
                (Character('E'), Movement::StrafeDown),
                (Named(NamedKey::Right), Movement::TurnRight),
                (Named(NamedKey::Left), Movement::TurnLeft),
                (Named(NamedKey::Up), Movement::LookUp),
                (Named(NamedKey::Down), Movement::LookDown),
            ],
            vec![
                (Character('J'), Command::ToggleDebug),
                (Character('K'), Command::ToggleWireframe),
                (Character('R'), Command::ResetCamera),
                (Character('L'), Command::LookAtScene),
                (Character('M'), Command::ToggleMouseControls),
                (Character('N'), Command::ToggleNullCamera),
            ],
        )
    }
}
