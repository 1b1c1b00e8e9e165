//! Rendering of routing scenes into dataset images.
//!
//! - [`scene`]: the abstract graphics scene solvers emit
//! - [`svg`]: structured SVG document model and serializer
//! - [`color`]: golden-angle net color assignment
//! - [`renderer`]: cropping, marker restyling and artifact writing
//! - [`raster`]: SVG to PNG rasterization

pub mod color;
pub mod raster;
pub mod renderer;
pub mod scene;
pub mod svg;

pub use color::{connection_index_from_label, hsl_to_hex, NetColorAssigner};
pub use raster::rasterize_svg_to_png;
pub use renderer::{CropMode, ImageArtifact, ImageRenderer, NetStyle, RenderConfig};
pub use scene::{GraphicsScene, SceneLine, ScenePoint, SceneRect};
pub use svg::{SvgCircle, SvgDocument, SvgNode, SvgOptions};
