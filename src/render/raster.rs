//! SVG to PNG rasterization.

use std::io::Cursor;

use crate::error::RenderError;

/// Guard against pathological allocations.
const MAX_DIM: u32 = 16_384;

/// Rasterize an SVG string to PNG bytes `width` pixels wide, preserving the
/// document's aspect ratio.
pub fn rasterize_svg_to_png(svg: &str, width: u32) -> Result<Vec<u8>, RenderError> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(svg.as_bytes(), &opts)
        .map_err(|e| RenderError::SvgParse(e.to_string()))?;

    let size = tree.size();
    let aspect = size.height() / size.width();
    let height = ((width as f32) * aspect).round().max(1.0) as u32;
    if width == 0 || width > MAX_DIM || height > MAX_DIM {
        return Err(RenderError::InvalidSize { width, height });
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or(RenderError::InvalidSize { width, height })?;
    pixmap.fill(resvg::tiny_skia::Color::WHITE);

    let sx = (width as f32) / size.width();
    let sy = (height as f32) / size.height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);
    resvg::render(&tree, xform, &mut pixmap.as_mut());

    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    let image = image::RgbaImage::from_raw(width, height, rgba)
        .ok_or(RenderError::InvalidSize { width, height })?;

    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| RenderError::PngEncode(e.to_string()))?;
    Ok(buf)
}
