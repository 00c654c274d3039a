//! The two sides of an alignment session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two independently segmented volumes.
///
/// `A` is conventionally the in-vivo acquisition and `B` the ex-vivo one,
/// but nothing in the engine depends on that assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// First volume (in-vivo)
    A,
    /// Second volume (ex-vivo)
    B,
}

impl Side {
    /// Both sides in fixed order.
    pub const ALL: [Side; 2] = [Side::A, Side::B];

    /// The opposite side.
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// Lowercase suffix used in on-disk file names (`overlay_a.npy`).
    pub fn suffix(self) -> &'static str {
        match self {
            Side::A => "a",
            Side::B => "b",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => f.write_str("A"),
            Side::B => f.write_str("B"),
        }
    }
}

/// A value held once per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidePair<T> {
    /// Value for side A
    pub a: T,
    /// Value for side B
    pub b: T,
}

impl<T> SidePair<T> {
    pub fn new(a: T, b: T) -> Self {
        Self { a, b }
    }

    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::A => &mut self.a,
            Side::B => &mut self.b,
        }
    }

    /// Replace the value for `side`, returning the previous one.
    pub fn replace(&mut self, side: Side, value: T) -> T {
        std::mem::replace(self.get_mut(side), value)
    }
}
