//! Lane model.
//!
//! A lane is one concurrent execution track (a machine, a worker, a room).
//! Items occupy one or more lanes simultaneously for a lane-specific duration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque execution track, value-equal by its id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Lane(u32);

impl Lane {
    /// Creates a lane with the given id.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The lane's id.
    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl From<u32> for Lane {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_identity() {
        assert_eq!(Lane::new(3), Lane::from(3));
        assert_ne!(Lane::new(3), Lane::new(4));
        assert!(Lane::new(1) < Lane::new(2));
        assert_eq!(Lane::new(9).id(), 9);
    }

    #[test]
    fn test_lane_serializes_as_integer() {
        let json = serde_json::to_string(&Lane::new(5)).unwrap();
        assert_eq!(json, "5");
        let back: Lane = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Lane::new(5));
    }
}
