//! Board-space geometry and its projection into image pixel space.
//!
//! Board-space is the routing problem's coordinate system in millimetres.
//! A [`Projection`] fits a scene's bounding box into a fixed-size canvas with
//! uniform scale, optionally flipping the Y axis, and computes crop viewports
//! around the board outline.

use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};

/// Axis orientation of scene coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSystem {
    /// Y grows upwards; flipped when projected into pixels.
    #[default]
    Cartesian,
    /// Y grows downwards, same as pixel space.
    Screen,
}

/// Rectangular board outline in board-space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardOutline {
    pub center: Point,
    pub width: f64,
    pub height: f64,
}

impl BoardOutline {
    pub fn new(center: Point, width: f64, height: f64) -> Self {
        Self {
            center,
            width,
            height,
        }
    }

    pub fn min_x(&self) -> f64 {
        self.center.x - self.width / 2.0
    }

    pub fn min_y(&self) -> f64 {
        self.center.y - self.height / 2.0
    }

    pub fn max_x(&self) -> f64 {
        self.center.x + self.width / 2.0
    }

    pub fn max_y(&self) -> f64 {
        self.center.y + self.height / 2.0
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.min_x(), self.min_y(), self.max_x(), self.max_y())
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x(), self.min_y()),
            Point::new(self.max_x(), self.min_y()),
            Point::new(self.max_x(), self.max_y()),
            Point::new(self.min_x(), self.max_y()),
        ]
    }
}

/// Output canvas parameters for a projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionConfig {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    pub coordinate_system: CoordinateSystem,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 640.0,
            padding: 40.0,
            coordinate_system: CoordinateSystem::Cartesian,
        }
    }
}

/// Axis-aligned bounding box of a set of points, `None` when empty.
pub fn bounds_of<I>(points: I) -> Option<Rect>
where
    I: IntoIterator<Item = Point>,
{
    let mut iter = points.into_iter();
    let first = iter.next()?;
    let mut rect = Rect::from_points(first, first);
    for p in iter {
        rect = rect.union_pt(p);
    }
    Some(rect)
}

/// Uniform-scale affine mapping from board-space to pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    transform: Affine,
    scale: f64,
}

impl Projection {
    /// Fit `bounds` into the canvas described by `config`.
    ///
    /// Zero-width or zero-height bounds are treated as one unit wide so the
    /// scale stays finite.
    pub fn fit(bounds: Rect, config: &ProjectionConfig) -> Self {
        let extent_w = clamp_extent(bounds.width());
        let extent_h = clamp_extent(bounds.height());
        let drawable_w = (config.width - 2.0 * config.padding).max(1.0);
        let drawable_h = (config.height - 2.0 * config.padding).max(1.0);
        let scale = (drawable_w / extent_w).min(drawable_h / extent_h);

        let y_scale = match config.coordinate_system {
            CoordinateSystem::Cartesian => -scale,
            CoordinateSystem::Screen => scale,
        };
        let center = bounds.center();
        let transform = Affine::translate((config.width / 2.0, config.height / 2.0))
            * Affine::scale_non_uniform(scale, y_scale)
            * Affine::translate((-center.x, -center.y));

        Self { transform, scale }
    }

    pub fn project(&self, p: Point) -> Point {
        self.transform * p
    }

    /// Pixels per board-space unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Pixel viewport enclosing the projected board corners, grown by
    /// `padding` pixels on every side.
    pub fn viewport(&self, board: &BoardOutline, padding: f64) -> Rect {
        let projected = board.corners().map(|c| self.project(c));
        let tight = bounds_of(projected).unwrap_or(Rect::ZERO);
        tight.inflate(padding, padding)
    }
}

fn clamp_extent(extent: f64) -> f64 {
    if extent.is_finite() && extent > 0.0 {
        extent
    } else {
        1.0
    }
}
