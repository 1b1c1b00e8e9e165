//! Abstract graphics scene produced by routing solvers.
//!
//! Coordinates are board-space millimetres. Points carry labels; a label
//! ending in `_<n>` marks a port of connection `n`.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

use crate::geometry::bounds_of;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenePoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ScenePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            label: None,
            color: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneLine {
    pub points: Vec<Point>,
    /// Stroke width in board-space units.
    pub stroke_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRect {
    pub center: Point,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
}

impl SceneRect {
    pub fn rect(&self) -> Rect {
        Rect::from_center_size(self.center, (self.width, self.height))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphicsScene {
    #[serde(default)]
    pub points: Vec<ScenePoint>,
    #[serde(default)]
    pub lines: Vec<SceneLine>,
    #[serde(default)]
    pub rects: Vec<SceneRect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl GraphicsScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.lines.is_empty() && self.rects.is_empty()
    }

    /// Bounding box of every primitive, `None` for an empty scene.
    pub fn bounds(&self) -> Option<Rect> {
        let points = self.points.iter().map(ScenePoint::position);
        let lines = self.lines.iter().flat_map(|l| l.points.iter().copied());
        let rects = self.rects.iter().flat_map(|r| {
            let rect = r.rect();
            [Point::new(rect.x0, rect.y0), Point::new(rect.x1, rect.y1)]
        });
        bounds_of(points.chain(lines).chain(rects))
    }
}
