use std::fmt;

use pilotlink_frame::{Message, MessageKind};
use serde::Serialize;

/// Position and heading of the robot as last reported by the board.
///
/// Fields are private; a new pose replaces the old one as a whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Pose {
    x: f64,
    y: f64,
    h: f64,
}

impl Pose {
    pub const ORIGIN: Pose = Pose {
        x: 0.0,
        y: 0.0,
        h: 0.0,
    };

    pub fn new(x: f64, y: f64, h: f64) -> Self {
        Self { x, y, h }
    }

    /// Offset from the origin along X, in meters.
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Offset from the origin along Y, in meters.
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Heading in degrees; may be negative.
    pub fn h(&self) -> f64 {
        self.h
    }

    /// Build a pose from a `Pose` message with numeric `X`, `Y` and `H`.
    pub fn from_message(msg: &Message) -> Option<Self> {
        if msg.kind() != MessageKind::Pose {
            return None;
        }
        Some(Self::new(msg.number("X")?, msg.number("Y")?, msg.number("H")?))
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) @ {}°", self.x, self.y, self.h)
    }
}

#[cfg(test)]
mod tests {
    use pilotlink_frame::decode_line;

    use super::*;

    #[test]
    fn from_pose_message() {
        let msg = decode_line(r#"{"T":"Pose","X":1.5,"Y":-0.25,"H":90}"#).unwrap();
        assert_eq!(Pose::from_message(&msg), Some(Pose::new(1.5, -0.25, 90.0)));
    }

    #[test]
    fn rejects_other_kinds_and_missing_fields() {
        let moved = decode_line(r#"{"T":"Moved","X":1,"Y":2,"H":3}"#).unwrap();
        assert_eq!(Pose::from_message(&moved), None);

        let partial = decode_line(r#"{"T":"Pose","X":1,"Y":2}"#).unwrap();
        assert_eq!(Pose::from_message(&partial), None);

        let textual = decode_line(r#"{"T":"Pose","X":"1","Y":2,"H":3}"#).unwrap();
        assert_eq!(Pose::from_message(&textual), None);
    }

    #[test]
    fn equality_is_field_wise() {
        assert_eq!(Pose::default(), Pose::ORIGIN);
        assert_ne!(Pose::new(1.0, 0.0, 0.0), Pose::ORIGIN);
        assert_ne!(Pose::new(0.0, 0.0, -0.5), Pose::ORIGIN);
    }
}
