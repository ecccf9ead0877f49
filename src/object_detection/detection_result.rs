use crate::annotations::point::Point;
use image::RgbImage;

/// Where the target ended up in an image.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ObjectLocation {
    /// Pixel centre of the winning box.
    Found(Point),
    NotFound,
}

impl ObjectLocation {
    /// What the coordinate log records for an image without the target.
    pub const NOT_FOUND_SENTINEL: Point = Point { x: -1, y: -1 };

    pub fn point(&self) -> Option<Point> {
        match self {
            ObjectLocation::Found(point) => Some(*point),
            ObjectLocation::NotFound => None,
        }
    }

    /// The point written to the coordinate log, with the sentinel standing in for "not found".
    pub fn logged_point(&self) -> Point {
        self.point().unwrap_or(Self::NOT_FOUND_SENTINEL)
    }
}

/// Outcome of one detect call: the image, annotated when the target was found, and where the
/// target is.
#[derive(Clone, Debug)]
pub struct DetectionResult {
    pub image: RgbImage,
    pub location: ObjectLocation,
}

impl DetectionResult {
    /// One human readable line describing the outcome.
    pub fn summary(&self) -> String {
        match self.location {
            ObjectLocation::Found(point) => format!("Found object at {}, {}", point.x, point.y),
            ObjectLocation::NotFound => "Object not found".to_string(),
        }
    }
}
