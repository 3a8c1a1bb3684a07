//! Rectangles in the normalized monitor frame.
//!
//! The origin is the bottom-left corner of the primary monitor, x grows to the
//! right and y grows upward. Converting from native OS coordinates is the
//! display collaborator's job.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect { x, y, width, height }
    }

    pub fn max_x(&self) -> f64 { self.x + self.width }

    pub fn max_y(&self) -> f64 { self.y + self.height }

    pub fn area(&self) -> f64 { self.width * self.height }

    pub fn is_empty(&self) -> bool { self.width <= 0.0 || self.height <= 0.0 }

    pub fn intersection(&self, other: &Self) -> Self {
        let min_x = f64::max(self.x, other.x);
        let max_x = f64::min(self.max_x(), other.max_x());
        let min_y = f64::max(self.y, other.y);
        let max_y = f64::min(self.max_y(), other.max_y());
        Rect::new(min_x, min_y, f64::max(max_x - min_x, 0.), f64::max(max_y - min_y, 0.))
    }

    pub fn contains_rect(&self, other: Self) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.max_x() >= other.max_x()
            && self.max_y() >= other.max_y()
    }
}

pub trait IsWithin {
    fn is_within(&self, how_much: f64, other: Self) -> bool;
}

impl IsWithin for f64 {
    fn is_within(&self, how_much: f64, other: Self) -> bool { (self - other).abs() < how_much }
}

impl IsWithin for Rect {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.x.is_within(how_much, other.x)
            && self.y.is_within(how_much, other.y)
            && self.width.is_within(how_much, other.width)
            && self.height.is_within(how_much, other.height)
    }
}

pub trait SameAs: IsWithin + Sized {
    fn same_as(&self, other: Self) -> bool { self.is_within(0.1, other) }
}

impl SameAs for Rect {}
