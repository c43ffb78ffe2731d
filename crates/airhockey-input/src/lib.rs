//! # Air Hockey Input
//!
//! Paddle control state for the air-hockey table.
//!
//! Each paddle accumulates directional "shift" counts per axis direction as
//! keys are pressed; the game loop drains them into paddle impulses. Global
//! requests such as serve or reset are collected as [`Action`] flags. All
//! state lives in an explicit [`InputContext`], zeroed on creation.

use std::collections::{HashMap, HashSet};

use bitflags::bitflags;
use glam::Vec2;

/// Input event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Keyboard key pressed
    KeyPressed(KeyCode),
    /// Keyboard key released
    KeyReleased(KeyCode),
}

/// Keyboard key codes used by the table controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    W, A, S, D,
    R, P,
    Left, Right, Up, Down,
    Space,
    Escape,
    Unknown,
}

impl std::str::FromStr for KeyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s.to_ascii_lowercase().as_str() {
            "w" => Self::W,
            "a" => Self::A,
            "s" => Self::S,
            "d" => Self::D,
            "r" => Self::R,
            "p" => Self::P,
            "left" => Self::Left,
            "right" => Self::Right,
            "up" => Self::Up,
            "down" => Self::Down,
            "space" => Self::Space,
            "escape" | "esc" => Self::Escape,
            other => return Err(format!("unknown key '{}'", other)),
        };
        Ok(key)
    }
}

/// Which player's paddle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub const ALL: [Player; 2] = [Player::One, Player::Two];

    fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

/// Direction of a paddle shift on the table plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    PosX,
    NegX,
    PosZ,
    NegZ,
}

bitflags! {
    /// Requests raised by the players
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Action: u32 {
        const SERVE = 1 << 0;
        const RESET = 1 << 1;
        const PAUSE = 1 << 2;
        const QUIT = 1 << 3;
    }
}

/// Accumulated shift requests of one paddle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShiftCounters {
    pub x_pos: u32,
    pub x_neg: u32,
    pub z_pos: u32,
    pub z_neg: u32,
}

impl ShiftCounters {
    /// Count one shift in `direction`
    pub fn record(&mut self, direction: Direction) {
        let counter = match direction {
            Direction::PosX => &mut self.x_pos,
            Direction::NegX => &mut self.x_neg,
            Direction::PosZ => &mut self.z_pos,
            Direction::NegZ => &mut self.z_neg,
        };
        *counter = counter.saturating_add(1);
    }

    /// Net shift on the plane as `(x, z)`
    pub fn net(&self) -> Vec2 {
        Vec2::new(
            self.x_pos as f32 - self.x_neg as f32,
            self.z_pos as f32 - self.z_neg as f32,
        )
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// What a bound key does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Shift(Player, Direction),
    Action(Action),
}

/// Key to control mapping
#[derive(Debug, Clone)]
pub struct KeyBindings {
    map: HashMap<KeyCode, Binding>,
}

impl KeyBindings {
    /// Empty bindings
    pub fn empty() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Bind `key`, replacing any earlier binding
    pub fn bind(&mut self, key: KeyCode, binding: Binding) -> &mut Self {
        self.map.insert(key, binding);
        self
    }

    pub fn get(&self, key: KeyCode) -> Option<Binding> {
        self.map.get(&key).copied()
    }
}

impl Default for KeyBindings {
    /// WASD drives paddle 1, the arrow keys paddle 2.
    fn default() -> Self {
        use Direction::*;

        let mut bindings = Self::empty();
        bindings
            .bind(KeyCode::D, Binding::Shift(Player::One, PosX))
            .bind(KeyCode::A, Binding::Shift(Player::One, NegX))
            .bind(KeyCode::S, Binding::Shift(Player::One, PosZ))
            .bind(KeyCode::W, Binding::Shift(Player::One, NegZ))
            .bind(KeyCode::Right, Binding::Shift(Player::Two, PosX))
            .bind(KeyCode::Left, Binding::Shift(Player::Two, NegX))
            .bind(KeyCode::Down, Binding::Shift(Player::Two, PosZ))
            .bind(KeyCode::Up, Binding::Shift(Player::Two, NegZ))
            .bind(KeyCode::Space, Binding::Action(Action::SERVE))
            .bind(KeyCode::R, Binding::Action(Action::RESET))
            .bind(KeyCode::P, Binding::Action(Action::PAUSE))
            .bind(KeyCode::Escape, Binding::Action(Action::QUIT));
        bindings
    }
}

/// Control state for both paddles
#[derive(Debug, Clone)]
pub struct InputContext {
    bindings: KeyBindings,
    shifts: [ShiftCounters; 2],
    action: Action,
    held: HashSet<KeyCode>,
}

impl InputContext {
    /// Create a context with the default key bindings
    pub fn new() -> Self {
        Self::with_bindings(KeyBindings::default())
    }

    pub fn with_bindings(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            shifts: [ShiftCounters::default(); 2],
            action: Action::empty(),
            held: HashSet::new(),
        }
    }

    /// Handle an input event
    pub fn handle_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyPressed(key) => {
                self.held.insert(*key);
                match self.bindings.get(*key) {
                    Some(Binding::Shift(player, direction)) => self.record(player, direction),
                    Some(Binding::Action(action)) => self.action |= action,
                    None => log::trace!("Unbound key {:?}", key),
                }
            }
            InputEvent::KeyReleased(key) => {
                self.held.remove(key);
            }
        }
    }

    /// Count one shift of `player`'s paddle
    pub fn record(&mut self, player: Player, direction: Direction) {
        self.shifts[player.index()].record(direction);
    }

    pub fn shifts(&self, player: Player) -> &ShiftCounters {
        &self.shifts[player.index()]
    }

    /// Net `(x, z)` shift requested for `player`
    pub fn net_shift(&self, player: Player) -> Vec2 {
        self.shifts[player.index()].net()
    }

    /// Return the net shift for `player` and zero its counters
    pub fn take_shift(&mut self, player: Player) -> Vec2 {
        let counters = &mut self.shifts[player.index()];
        let net = counters.net();
        counters.clear();
        net
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Return pending actions and clear them
    pub fn take_action(&mut self) -> Action {
        std::mem::take(&mut self.action)
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Zero every counter and action
    pub fn clear(&mut self) {
        for counters in &mut self.shifts {
            counters.clear();
        }
        self.action = Action::empty();
        self.held.clear();
    }
}

impl Default for InputContext {
    fn default() -> Self {
        Self::new()
    }
}
