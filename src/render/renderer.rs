//! Scene to cropped SVG and PNG rendering.
//!
//! Rendering steps:
//! 1. add the board outline to the scene
//! 2. project the scene into an [`SvgDocument`] with labels disabled
//! 3. set every point marker's radius to the configured pixel radius
//! 4. stroke markers whose label carries a connection index with the net color
//! 5. crop to the board viewport (see [`CropMode`])
//! 6. serialize, and optionally rasterize and write `.svg` + `.png`

use std::path::{Path, PathBuf};

use kurbo::Point;

use super::color::{connection_index_from_label, NetColorAssigner};
use super::raster::rasterize_svg_to_png;
use super::scene::{GraphicsScene, SceneRect};
use super::svg::{SvgDocument, SvgOptions};
use crate::error::RenderError;
use crate::geometry::{BoardOutline, CoordinateSystem, Projection, ProjectionConfig};

/// Whether the computed crop viewport is applied to the output SVG.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CropMode {
    /// Set `viewBox`, `width` and `height` to the board viewport.
    #[default]
    Apply,
    /// Keep the full canvas. Matches datasets produced without cropping.
    Preserve,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub padding: f64,
    pub crop_padding: f64,
    pub crop: CropMode,
    pub coordinate_system: CoordinateSystem,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            canvas_width: 640.0,
            canvas_height: 640.0,
            padding: 40.0,
            crop_padding: 8.0,
            crop: CropMode::Apply,
            coordinate_system: CoordinateSystem::Cartesian,
        }
    }
}

/// Per-point styling applied to marker circles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetStyle {
    /// Marker radius in board-space units.
    pub marker_radius: f64,
    /// Stroke width in pixels for connection markers.
    pub stroke_width: f64,
    pub colors: NetColorAssigner,
}

impl NetStyle {
    pub fn new(marker_radius: f64, colors: NetColorAssigner) -> Self {
        Self {
            marker_radius,
            stroke_width: 2.0,
            colors,
        }
    }
}

/// Paths of a written `.svg`/`.png` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    pub svg_path: PathBuf,
    pub png_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ImageRenderer {
    config: RenderConfig,
}

impl ImageRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render `scene` to a cropped, restyled SVG string.
    pub fn render_svg(
        &self,
        scene: &GraphicsScene,
        board: &BoardOutline,
        style: &NetStyle,
    ) -> String {
        self.render_document(scene, board, style).to_svg_string()
    }

    /// Same as [`render_svg`](Self::render_svg) but returns the document model.
    pub fn render_document(
        &self,
        scene: &GraphicsScene,
        board: &BoardOutline,
        style: &NetStyle,
    ) -> SvgDocument {
        let mut scene = scene.clone();
        scene.rects.push(SceneRect {
            center: board.center,
            width: board.width,
            height: board.height,
            fill: None,
            stroke: Some("#000000".to_string()),
        });

        let projection_config = ProjectionConfig {
            width: self.config.canvas_width,
            height: self.config.canvas_height,
            padding: self.config.padding,
            coordinate_system: self.config.coordinate_system,
        };
        let bounds = scene.bounds().unwrap_or_else(|| board.rect());
        let projection = Projection::fit(bounds, &projection_config);

        let mut doc = SvgDocument::from_scene(
            &scene,
            &projection,
            &SvgOptions {
                width: self.config.canvas_width,
                height: self.config.canvas_height,
                show_labels: false,
            },
        );

        let radius_px = marker_radius_px(&projection, style.marker_radius);
        for circle in doc.circles_mut() {
            circle.r = radius_px;
            let index = circle
                .label
                .as_deref()
                .and_then(connection_index_from_label);
            if let Some(index) = index {
                circle.stroke = Some(style.colors.color(index));
                circle.stroke_width = Some(style.stroke_width);
            }
        }

        if self.config.crop == CropMode::Apply {
            doc.crop_to(projection.viewport(board, self.config.crop_padding));
        }
        doc
    }

    /// Write `<dir>/<stem>.svg` and `<dir>/<stem>.png`, creating `dir`.
    pub fn write_artifacts(
        svg: &str,
        dir: &Path,
        stem: &str,
        png_width: u32,
    ) -> Result<ImageArtifact, RenderError> {
        std::fs::create_dir_all(dir)?;
        let svg_path = dir.join(format!("{}.svg", stem));
        let png_path = dir.join(format!("{}.png", stem));

        std::fs::write(&svg_path, svg)?;
        let png = rasterize_svg_to_png(svg, png_width)?;
        std::fs::write(&png_path, png)?;

        Ok(ImageArtifact { svg_path, png_path })
    }
}

fn marker_radius_px(projection: &Projection, radius: f64) -> f64 {
    let origin = projection.project(Point::ZERO);
    let edge = projection.project(Point::new(radius, 0.0));
    (edge.x - origin.x).abs().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::scene::ScenePoint;

    fn board() -> BoardOutline {
        BoardOutline::new(Point::ZERO, 10.0, 10.0)
    }

    fn scene() -> GraphicsScene {
        let mut scene = GraphicsScene::new();
        scene.points.push(ScenePoint::new(-5.0, 1.0).with_label("P00_0"));
        scene.points.push(ScenePoint::new(5.0, -1.0).with_label("P01_0"));
        scene.points.push(ScenePoint::new(0.0, 5.0).with_label("P02_1"));
        scene.points.push(ScenePoint::new(0.0, 0.0).with_label("via"));
        scene
    }

    #[test]
    fn test_markers_get_radius_and_net_stroke() {
        let renderer = ImageRenderer::default();
        let style = NetStyle::new(0.15, NetColorAssigner::new(2));
        let doc = renderer.render_document(&scene(), &board(), &style);

        let circles: Vec<_> = doc.circles().collect();
        assert_eq!(circles.len(), 4);
        for c in &circles {
            assert!((c.r - 8.4).abs() < 1e-9, "radius {}", c.r);
        }

        let colors = NetColorAssigner::new(2);
        assert_eq!(circles[0].stroke.as_deref(), Some(colors.color(0).as_str()));
        assert_eq!(circles[1].stroke, circles[0].stroke);
        assert_eq!(circles[2].stroke.as_deref(), Some(colors.color(1).as_str()));
        assert_eq!(circles[2].stroke_width, Some(2.0));
        assert!(circles[3].stroke.is_none());
    }

    #[test]
    fn test_crop_mode_controls_view_box() {
        let style = NetStyle::new(0.15, NetColorAssigner::default());

        let cropped = ImageRenderer::default().render_svg(&scene(), &board(), &style);
        assert!(cropped.contains(r#"viewBox="32 32 576 576""#));

        let preserved = ImageRenderer::new(RenderConfig {
            crop: CropMode::Preserve,
            ..Default::default()
        })
        .render_svg(&scene(), &board(), &style);
        assert!(preserved.contains(r#"viewBox="0 0 640 640""#));
    }

    #[test]
    fn test_empty_scene_still_renders_board() {
        let style = NetStyle::new(0.15, NetColorAssigner::default());
        let svg = ImageRenderer::default().render_svg(&GraphicsScene::new(), &board(), &style);
        assert!(svg.contains("<rect"));
        assert!(!svg.contains("<circle"));
    }

    #[test]
    fn test_write_artifacts_creates_parent_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("images").join("routed");
        let style = NetStyle::new(0.15, NetColorAssigner::default());
        let svg = ImageRenderer::default().render_svg(&scene(), &board(), &style);

        let artifact = ImageRenderer::write_artifacts(&svg, &dir, "sample-000001", 128).unwrap();
        assert!(artifact.svg_path.exists());
        assert!(artifact.png_path.exists());
        assert_eq!(artifact.png_path.file_name().unwrap(), "sample-000001.png");
    }
}
