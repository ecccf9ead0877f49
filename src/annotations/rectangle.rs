use crate::annotations::point::Point;

/// An axis aligned rectangle in pixel coordinates of the original image.
///
/// This project uses the standard convention of the left side of the image being x=0 and the top
/// of the image being y=0. Unlike an annotation bounding box, a detected rectangle is never
/// validated: the network can predict boxes that hang off the image or, after truncation, have
/// zero or negative extent. Every consumer has to tolerate that.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rectangle { x, y, width, height }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Area in pixels. Degenerate rectangles have zero area.
    pub fn area(&self) -> i64 {
        if self.width <= 0 || self.height <= 0 {
            return 0;
        }
        self.width as i64 * self.height as i64
    }

    /// Overlapping area of two rectangles, zero when they are disjoint or degenerate.
    pub fn intersection_area(&self, other: &Rectangle) -> i64 {
        if self.area() == 0 || other.area() == 0 {
            return 0;
        }
        let left = self.left().max(other.left()) as i64;
        let top = self.top().max(other.top()) as i64;
        let right = self.right().min(other.right()) as i64;
        let bottom = self.bottom().min(other.bottom()) as i64;
        if right <= left || bottom <= top {
            return 0;
        }
        (right - left) * (bottom - top)
    }

    /// Intersection over union of two rectangles.
    ///
    /// Returns 0 when the union is empty, so degenerate boxes never suppress anything.
    pub fn intersection_over_union(&self, other: &Rectangle) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0 {
            return 0.0;
        }
        (intersection as f64 / union as f64) as f32
    }

    /// Pixel centre of the rectangle, rounding down.
    pub fn center(&self) -> Point {
        let half_floor = |start: i32, extent: i32| {
            (2 * start as i64 + extent as i64 - 1)
                .div_euclid(2)
                .clamp(i32::MIN as i64, i32::MAX as i64) as i32
        };
        Point::new(half_floor(self.x, self.width), half_floor(self.y, self.height))
    }
}
