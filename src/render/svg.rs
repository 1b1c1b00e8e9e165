//! Structured SVG document model.
//!
//! A [`GraphicsScene`] is projected into pixel space as an [`SvgDocument`]
//! whose elements can be restyled in place before serialization. Restyling
//! works on typed nodes, never on SVG text.

use std::fmt::Write;

use kurbo::{Point, Rect};

use super::scene::GraphicsScene;
use crate::geometry::Projection;

const DEFAULT_POINT_RADIUS: f64 = 3.0;
const DEFAULT_POINT_FILL: &str = "#444444";
const DEFAULT_LINE_COLOR: &str = "#000000";
const BACKGROUND: &str = "#ffffff";
const LABEL_FONT_SIZE: f64 = 10.0;

/// Options for projecting a scene into an SVG document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvgOptions {
    pub width: f64,
    pub height: f64,
    pub show_labels: bool,
}

/// A point marker.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgCircle {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
    pub fill: String,
    pub stroke: Option<String>,
    pub stroke_width: Option<f64>,
    /// Scene label of the point. Kept for restyling, emitted only as a
    /// `<text>` node when labels are enabled.
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SvgNode {
    Rect {
        rect: Rect,
        fill: Option<String>,
        stroke: Option<String>,
        stroke_width: f64,
    },
    Polyline {
        points: Vec<Point>,
        stroke: String,
        stroke_width: f64,
    },
    Circle(SvgCircle),
    Text {
        at: Point,
        content: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    pub width: f64,
    pub height: f64,
    pub view_box: Rect,
    pub background: String,
    pub nodes: Vec<SvgNode>,
}

impl SvgDocument {
    /// Project every scene primitive through `projection`.
    pub fn from_scene(scene: &GraphicsScene, projection: &Projection, options: &SvgOptions) -> Self {
        let mut nodes = Vec::with_capacity(scene.rects.len() + scene.lines.len() + scene.points.len());

        for rect in &scene.rects {
            let r = rect.rect();
            let a = projection.project(Point::new(r.x0, r.y0));
            let b = projection.project(Point::new(r.x1, r.y1));
            nodes.push(SvgNode::Rect {
                rect: Rect::from_points(a, b),
                fill: rect.fill.clone(),
                stroke: rect.stroke.clone(),
                stroke_width: 1.0,
            });
        }

        for line in &scene.lines {
            nodes.push(SvgNode::Polyline {
                points: line.points.iter().map(|p| projection.project(*p)).collect(),
                stroke: line
                    .stroke_color
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LINE_COLOR.to_string()),
                stroke_width: (line.stroke_width * projection.scale()).max(1.0),
            });
        }

        for point in &scene.points {
            let at = projection.project(point.position());
            nodes.push(SvgNode::Circle(SvgCircle {
                cx: at.x,
                cy: at.y,
                r: DEFAULT_POINT_RADIUS,
                fill: point
                    .color
                    .clone()
                    .unwrap_or_else(|| DEFAULT_POINT_FILL.to_string()),
                stroke: None,
                stroke_width: None,
                label: point.label.clone(),
            }));
            if options.show_labels {
                if let Some(label) = &point.label {
                    nodes.push(SvgNode::Text {
                        at: Point::new(at.x + DEFAULT_POINT_RADIUS + 2.0, at.y - 2.0),
                        content: label.clone(),
                    });
                }
            }
        }

        Self {
            width: options.width,
            height: options.height,
            view_box: Rect::new(0.0, 0.0, options.width, options.height),
            background: BACKGROUND.to_string(),
            nodes,
        }
    }

    pub fn circles_mut(&mut self) -> impl Iterator<Item = &mut SvgCircle> {
        self.nodes.iter_mut().filter_map(|node| match node {
            SvgNode::Circle(circle) => Some(circle),
            _ => None,
        })
    }

    pub fn circles(&self) -> impl Iterator<Item = &SvgCircle> {
        self.nodes.iter().filter_map(|node| match node {
            SvgNode::Circle(circle) => Some(circle),
            _ => None,
        })
    }

    /// Restrict the visible region to `viewport`; the outer size follows it.
    pub fn crop_to(&mut self, viewport: Rect) {
        self.view_box = viewport;
        self.width = viewport.width();
        self.height = viewport.height();
    }

    pub fn to_svg_string(&self) -> String {
        let mut out = String::new();
        let vb = self.view_box;
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="{} {} {} {}">"#,
            num(self.width),
            num(self.height),
            num(vb.x0),
            num(vb.y0),
            num(vb.width()),
            num(vb.height())
        );
        let _ = writeln!(
            out,
            r#"  <rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
            num(vb.x0),
            num(vb.y0),
            num(vb.width()),
            num(vb.height()),
            xml_escape(&self.background)
        );

        for node in &self.nodes {
            match node {
                SvgNode::Rect {
                    rect,
                    fill,
                    stroke,
                    stroke_width,
                } => {
                    let _ = writeln!(
                        out,
                        r#"  <rect x="{}" y="{}" width="{}" height="{}" fill="{}" stroke="{}" stroke-width="{}"/>"#,
                        num(rect.x0),
                        num(rect.y0),
                        num(rect.width()),
                        num(rect.height()),
                        xml_escape(fill.as_deref().unwrap_or("none")),
                        xml_escape(stroke.as_deref().unwrap_or("none")),
                        num(*stroke_width)
                    );
                }
                SvgNode::Polyline {
                    points,
                    stroke,
                    stroke_width,
                } => {
                    let coords: Vec<String> = points
                        .iter()
                        .map(|p| format!("{},{}", num(p.x), num(p.y)))
                        .collect();
                    let _ = writeln!(
                        out,
                        r#"  <polyline points="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linecap="round" stroke-linejoin="round"/>"#,
                        coords.join(" "),
                        xml_escape(stroke),
                        num(*stroke_width)
                    );
                }
                SvgNode::Circle(circle) => {
                    let _ = write!(
                        out,
                        r#"  <circle cx="{}" cy="{}" r="{}" fill="{}""#,
                        num(circle.cx),
                        num(circle.cy),
                        num(circle.r),
                        xml_escape(&circle.fill)
                    );
                    if let Some(stroke) = &circle.stroke {
                        let _ = write!(out, r#" stroke="{}""#, xml_escape(stroke));
                    }
                    if let Some(width) = circle.stroke_width {
                        let _ = write!(out, r#" stroke-width="{}""#, num(width));
                    }
                    out.push_str("/>\n");
                }
                SvgNode::Text { at, content } => {
                    let _ = writeln!(
                        out,
                        r#"  <text x="{}" y="{}" font-size="{}" font-family="monospace">{}</text>"#,
                        num(at.x),
                        num(at.y),
                        num(LABEL_FONT_SIZE),
                        xml_escape(content)
                    );
                }
            }
        }

        out.push_str("</svg>\n");
        out
    }
}

/// Format a coordinate with at most three decimals and no trailing zeros.
fn num(v: f64) -> String {
    let rounded = (v * 1000.0).round() / 1000.0;
    let s = format!("{:.3}", rounded);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ProjectionConfig;
    use crate::render::scene::ScenePoint;

    fn options() -> SvgOptions {
        SvgOptions {
            width: 640.0,
            height: 640.0,
            show_labels: false,
        }
    }

    #[test]
    fn test_num_formatting() {
        assert_eq!(num(1.0), "1");
        assert_eq!(num(1.25), "1.25");
        assert_eq!(num(0.33333), "0.333");
        assert_eq!(num(-0.0001), "0");
    }

    #[test]
    fn test_labels_disabled_emits_no_text() {
        let mut scene = GraphicsScene::new();
        scene.points.push(ScenePoint::new(0.0, 0.0).with_label("P00_0"));
        scene.points.push(ScenePoint::new(1.0, 1.0).with_label("P01_0"));
        let projection = Projection::fit(
            scene.bounds().unwrap(),
            &ProjectionConfig::default(),
        );

        let doc = SvgDocument::from_scene(&scene, &projection, &options());
        let svg = doc.to_svg_string();
        assert!(!svg.contains("<text"));
        assert_eq!(svg.matches("<circle").count(), 2);
        assert_eq!(doc.circles().filter(|c| c.label.is_some()).count(), 2);

        let labelled = SvgDocument::from_scene(
            &scene,
            &projection,
            &SvgOptions {
                show_labels: true,
                ..options()
            },
        );
        assert_eq!(labelled.to_svg_string().matches("<text").count(), 2);
    }

    #[test]
    fn test_crop_updates_outer_size_and_view_box() {
        let mut doc = SvgDocument::from_scene(
            &GraphicsScene::new(),
            &Projection::fit(Rect::new(0.0, 0.0, 1.0, 1.0), &ProjectionConfig::default()),
            &options(),
        );
        doc.crop_to(Rect::new(32.0, 32.0, 608.0, 608.0));
        let svg = doc.to_svg_string();
        assert!(svg.contains(r#"width="576" height="576" viewBox="32 32 576 576""#));
    }

    #[test]
    fn test_escapes_attribute_values() {
        assert_eq!(xml_escape(r#"a<"b">&'"#), "a&lt;&quot;b&quot;&gt;&amp;&apos;");
    }
}
