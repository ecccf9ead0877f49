use serde::{Deserialize, Serialize};
use std::fmt;

/// A struct representing a pixel location.
///
/// Uses the same integer coordinate type as [`Rectangle`](super::rectangle::Rectangle) so
/// centres computed from a box land on the pixel grid.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_log_format() {
        assert_eq!(Point::new(12, 23).to_string(), "(12,23)");
        assert_eq!(Point::new(-1, -1).to_string(), "(-1,-1)");
    }
}
