//! Software RGBA canvas
//!
//! `RasterSurface` implements the canvas subset the compositor needs on top of an
//! `image::RgbaImage`: solid fills and scaled sub-image blits with source-over blending.
//! Fractional rectangles are snapped to whole pixels.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use log::trace;

use super::frame::FrameAsset;
use super::geometry::{Color, Rect, SurfaceSize};
use super::traits::Surface;

/// RGBA software surface
#[derive(Debug, Clone)]
pub struct RasterSurface {
    pixels: RgbaImage,
    filter: FilterType,
}

impl RasterSurface {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            pixels: RgbaImage::new(size.width, size.height),
            filter: FilterType::Triangle,
        }
    }

    /// Resampling filter used by `draw_image`
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.pixels.width() && y < self.pixels.height() {
            let Rgba([r, g, b, a]) = *self.pixels.get_pixel(x, y);
            Some(Color { r, g, b, a })
        } else {
            None
        }
    }

    pub fn save(&self, path: &std::path::Path) -> image::ImageResult<()> {
        self.pixels.save(path)
    }
}

/// Snap a fractional rect to a pixel span `(x, y, w, h)` clipped to `bounds`.
fn snap(rect: Rect, bounds: (u32, u32)) -> Option<(u32, u32, u32, u32)> {
    let x0 = rect.x.round().max(0.0);
    let y0 = rect.y.round().max(0.0);
    let x1 = rect.right().round().min(bounds.0 as f64);
    let y1 = rect.bottom().round().min(bounds.1 as f64);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
}

impl Surface for RasterSurface {
    fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.pixels.width(), self.pixels.height())
    }

    fn set_size(&mut self, size: SurfaceSize) {
        if size != self.size() {
            trace!("RasterSurface: resize {} -> {}", self.size(), size);
            self.pixels = RgbaImage::new(size.width, size.height);
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some((x, y, w, h)) = snap(rect, self.pixels.dimensions()) else {
            return;
        };
        let fill = Rgba(color.to_rgba());
        for py in y..y + h {
            for px in x..x + w {
                self.pixels.put_pixel(px, py, fill);
            }
        }
    }

    fn draw_image(&mut self, asset: &FrameAsset, src: Rect, dst: Rect) {
        let Some((sx, sy, sw, sh)) = snap(src, asset.resolution()) else {
            return;
        };

        // Destination may hang off the surface; overlay() clips it
        let dw = dst.width.round();
        let dh = dst.height.round();
        if dw < 1.0 || dh < 1.0 {
            return;
        }

        let region = imageops::crop_imm(asset.pixels(), sx, sy, sw, sh).to_image();
        let scaled = if (dw as u32, dh as u32) == region.dimensions() {
            region
        } else {
            imageops::resize(&region, dw as u32, dh as u32, self.filter)
        };

        imageops::overlay(&mut self.pixels, &scaled, dst.x.round() as i64, dst.y.round() as i64);
    }
}
