//! Movement keys, mouse and scroll input, drained once per frame.

use crate::Vec2;

/// A held movement direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
}

impl Movement {
    pub const ALL: [Movement; 4] = [
        Movement::Forward,
        Movement::Backward,
        Movement::Left,
        Movement::Right,
    ];

    #[inline]
    fn bit(self) -> u8 {
        match self {
            Movement::Forward => 1 << 0,
            Movement::Backward => 1 << 1,
            Movement::Left => 1 << 2,
            Movement::Right => 1 << 3,
        }
    }
}

/// Set of currently held movement directions. Press/release are idempotent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MovementSet(u8);

impl MovementSet {
    pub const fn new() -> Self {
        Self(0)
    }

    /// Returns `true` if the direction was not held before.
    pub fn press(&mut self, movement: Movement) -> bool {
        let added = !self.contains(movement);
        self.0 |= movement.bit();
        added
    }

    /// Returns `true` if the direction was held before.
    pub fn release(&mut self, movement: Movement) -> bool {
        let removed = self.contains(movement);
        self.0 &= !movement.bit();
        removed
    }

    #[inline]
    pub fn contains(&self, movement: Movement) -> bool {
        self.0 & movement.bit() != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Movement> + '_ {
        Movement::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl FromIterator<Movement> for MovementSet {
    fn from_iter<I: IntoIterator<Item = Movement>>(iter: I) -> Self {
        let mut set = MovementSet::new();
        for m in iter {
            set.press(m);
        }
        set
    }
}

/// Input snapshot consumed by one camera tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputFrame {
    /// Mouse motion since the previous frame.
    pub mouse_delta: Vec2,
    /// Cumulative scroll wheel value (not a delta).
    pub scroll: f32,
    pub movements: MovementSet,
}

/// Collects window events between frames.
#[derive(Debug, Default)]
pub struct InputState {
    movements: MovementSet,
    mouse_delta: Vec2,
    scroll: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, movement: Movement) {
        self.movements.press(movement);
    }

    pub fn key_up(&mut self, movement: Movement) {
        self.movements.release(movement);
    }

    pub fn mouse_motion(&mut self, dx: f32, dy: f32) {
        self.mouse_delta += Vec2::new(dx, dy);
    }

    pub fn scroll(&mut self, lines: f32) {
        self.scroll += lines;
    }

    #[inline]
    pub fn movements(&self) -> MovementSet {
        self.movements
    }

    /// Snapshot for this frame; mouse motion is consumed, keys and scroll persist.
    pub fn drain(&mut self) -> InputFrame {
        InputFrame {
            mouse_delta: std::mem::take(&mut self.mouse_delta),
            scroll: self.scroll,
            movements: self.movements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_idempotent() {
        let mut set = MovementSet::new();
        assert!(set.press(Movement::Forward));
        assert!(!set.press(Movement::Forward));
        assert_eq!(set.len(), 1);
        assert!(set.release(Movement::Forward));
        assert!(set.is_empty());
    }

    #[test]
    fn release_unpressed_is_noop() {
        let mut set: MovementSet = [Movement::Left].into_iter().collect();
        assert!(!set.release(Movement::Right));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Movement::Left]);
    }

    #[test]
    fn drain_consumes_mouse_but_keeps_keys_and_scroll() {
        let mut input = InputState::new();
        input.key_down(Movement::Forward);
        input.key_down(Movement::Forward);
        input.mouse_motion(3.0, -1.0);
        input.mouse_motion(1.0, 0.5);
        input.scroll(1.0);
        input.scroll(2.0);

        let first = input.drain();
        assert_eq!(first.mouse_delta, Vec2::new(4.0, -0.5));
        assert_eq!(first.scroll, 3.0);
        assert!(first.movements.contains(Movement::Forward));

        input.key_up(Movement::Forward);
        let second = input.drain();
        assert_eq!(second.mouse_delta, Vec2::ZERO);
        assert_eq!(second.scroll, 3.0);
        assert!(second.movements.is_empty());
    }
}
