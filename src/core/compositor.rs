//! Canvas compositor - draws one frame with watermark crop and contain-fit
//!
//! Per draw:
//! 1. Fill the whole surface with the page background (letterbox bars blend in)
//! 2. Source rect: full width, height minus the watermark band, anchored top
//! 3. scale = min(surface.w / src.w, surface.h / src.h)
//! 4. Center the scaled rect on both axes
//! 5. Blit
//!
//! Stateless: the same inputs always produce the same pixels.

use log::{trace, warn};

use crate::entities::{Color, FrameAsset, Rect, Surface, SurfaceSize};

/// Default height of the watermark band baked into the bottom of each frame
pub const DEFAULT_WATERMARK_PX: u32 = 40;

/// Geometry of one draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawPlan {
    /// Region of the asset that is shown
    pub source: Rect,
    /// Where it lands on the surface
    pub dest: Rect,
    pub scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compositor {
    watermark_px: u32,
    background: Color,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(DEFAULT_WATERMARK_PX, Color::BACKDROP)
    }
}

impl Compositor {
    pub fn new(watermark_px: u32, background: Color) -> Self {
        Self {
            watermark_px,
            background,
        }
    }

    pub fn watermark_px(&self) -> u32 {
        self.watermark_px
    }

    pub fn background(&self) -> Color {
        self.background
    }

    /// Compute source/destination rectangles for an asset of `asset_size`.
    ///
    /// None if the surface has no area or the crop leaves nothing to show.
    pub fn plan(&self, asset_size: (u32, u32), surface: SurfaceSize) -> Option<DrawPlan> {
        let (asset_w, asset_h) = asset_size;
        let source_h = asset_h.saturating_sub(self.watermark_px);
        if surface.is_empty() || asset_w == 0 || source_h == 0 {
            return None;
        }

        let source = Rect::new(0.0, 0.0, asset_w as f64, source_h as f64);
        let surface_w = surface.width as f64;
        let surface_h = surface.height as f64;

        let scale = (surface_w / source.width).min(surface_h / source.height);
        let draw_w = source.width * scale;
        let draw_h = source.height * scale;

        let dest = Rect::new(
            (surface_w - draw_w) / 2.0,
            (surface_h - draw_h) / 2.0,
            draw_w,
            draw_h,
        );

        Some(DrawPlan { source, dest, scale })
    }

    /// Draw `frame` onto `surface`. No-op on an empty surface.
    pub fn draw(&self, surface: &mut dyn Surface, frame: &FrameAsset) -> Option<DrawPlan> {
        let size = surface.size();
        if size.is_empty() {
            return None;
        }

        surface.fill_rect(size.rect(), self.background);

        let Some(plan) = self.plan(frame.resolution(), size) else {
            warn!(
                "Compositor: {}x{} frame has nothing left after {}px watermark crop",
                frame.width(),
                frame.height(),
                self.watermark_px
            );
            return None;
        };

        trace!(
            "Compositor: {}x{} -> {:.1}x{:.1} at ({:.1}, {:.1}) scale {:.3}",
            plan.source.width,
            plan.source.height,
            plan.dest.width,
            plan.dest.height,
            plan.dest.x,
            plan.dest.y,
            plan.scale
        );
        surface.draw_image(frame, plan.source, plan.dest);
        Some(plan)
    }

    /// Draw frame `index` of `frames`, clamping the index.
    ///
    /// Returns the index actually drawn; None before any frame is loaded.
    pub fn draw_index(
        &self,
        surface: &mut dyn Surface,
        frames: &[FrameAsset],
        index: usize,
    ) -> Option<usize> {
        let last = frames.len().checked_sub(1)?;
        let index = index.min(last);
        self.draw(surface, &frames[index]).map(|_| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::RasterSurface;
    use crate::test_support::{DrawCall, RecordingSurface, solid_frame};

    const EPS: f64 = 1e-9;

    /// Test: Exact fill
    /// Validates: 800x600 surface, 400x300 post-crop source → scale 2, no letterbox
    #[test]
    fn test_exact_fill() {
        let plan = Compositor::default()
            .plan((400, 340), SurfaceSize::new(800, 600))
            .unwrap();

        assert_eq!(plan.source, Rect::new(0.0, 0.0, 400.0, 300.0));
        assert!((plan.scale - 2.0).abs() < EPS);
        assert_eq!(plan.dest, Rect::new(0.0, 0.0, 800.0, 600.0));
    }

    /// Test: Pillarbox
    /// Validates: 800x400 surface, 400x300 source → scale 4/3, ~533x400 centered
    #[test]
    fn test_letterbox_left_right() {
        let plan = Compositor::default()
            .plan((400, 340), SurfaceSize::new(800, 400))
            .unwrap();

        assert!((plan.scale - 4.0 / 3.0).abs() < EPS);
        assert!((plan.dest.width - 533.333).abs() < 0.01);
        assert!((plan.dest.height - 400.0).abs() < EPS);
        assert!((plan.dest.x - 133.333).abs() < 0.01);
        assert_eq!(plan.dest.y, 0.0);
        // Equal bars on both sides
        assert!((800.0 - plan.dest.right() - plan.dest.x).abs() < EPS);
    }

    /// Test: Contain-fit invariant over many aspect ratios
    /// Validates: Destination never exceeds the surface and touches at least one axis
    #[test]
    fn test_contain_fit_invariant() {
        let compositor = Compositor::new(0, Color::BACKDROP);
        let sizes = [1u32, 3, 17, 240, 333, 720, 1080, 1920, 4096];
        for &sw in &sizes {
            for &sh in &sizes {
                for &aw in &sizes {
                    for &ah in &sizes {
                        let surface = SurfaceSize::new(sw, sh);
                        let plan = compositor.plan((aw, ah), surface).unwrap();
                        assert!(
                            surface.rect().contains_rect(&plan.dest, 1e-6),
                            "{}x{} asset on {} overflowed: {:?}",
                            aw,
                            ah,
                            surface,
                            plan.dest
                        );
                        let fills_w = (plan.dest.width - sw as f64).abs() < 1e-6;
                        let fills_h = (plan.dest.height - sh as f64).abs() < 1e-6;
                        assert!(fills_w || fills_h);
                    }
                }
            }
        }
    }

    /// Test: Watermark crop
    /// Validates: Crop is anchored at the top and configurable
    #[test]
    fn test_watermark_crop() {
        let plan = Compositor::new(100, Color::BACKDROP)
            .plan((1280, 820), SurfaceSize::new(1280, 720))
            .unwrap();
        assert_eq!(plan.source, Rect::new(0.0, 0.0, 1280.0, 720.0));

        assert!(Compositor::default().plan((100, 40), SurfaceSize::new(10, 10)).is_none());
        assert!(Compositor::default().plan((100, 100), SurfaceSize::new(0, 10)).is_none());
    }

    /// Test: Draw order
    /// Validates: Backdrop fill covers the surface before the blit
    #[test]
    fn test_fill_then_blit() {
        let mut surface = RecordingSurface::new(SurfaceSize::new(800, 400));
        let frame = solid_frame(400, 340, [200, 10, 10, 255]);

        Compositor::default().draw(&mut surface, &frame).unwrap();

        assert_eq!(surface.calls.len(), 2);
        assert_eq!(
            surface.calls[0],
            DrawCall::Fill(Rect::new(0.0, 0.0, 800.0, 400.0), Color::BACKDROP)
        );
        match surface.calls[1] {
            DrawCall::Image { src, dst, .. } => {
                assert_eq!(src, Rect::new(0.0, 0.0, 400.0, 300.0));
                assert!((dst.x - 133.333).abs() < 0.01);
            }
            ref other => panic!("unexpected call {:?}", other),
        }
    }

    /// Test: Preconditions
    /// Validates: No frames / empty surface are silent no-ops; index is clamped
    #[test]
    fn test_draw_index_preconditions() {
        let compositor = Compositor::default();
        let mut surface = RecordingSurface::new(SurfaceSize::new(100, 100));

        assert_eq!(compositor.draw_index(&mut surface, &[], 3), None);
        assert!(surface.calls.is_empty());

        let frames = vec![solid_frame(10, 50, [0; 4]), solid_frame(20, 50, [0; 4])];
        assert_eq!(compositor.draw_index(&mut surface, &frames, 99), Some(1));
        match surface.calls.last().unwrap() {
            DrawCall::Image { asset_width, .. } => assert_eq!(*asset_width, 20),
            other => panic!("unexpected call {:?}", other),
        }

        let mut empty = RecordingSurface::new(SurfaceSize::new(0, 0));
        assert_eq!(compositor.draw_index(&mut empty, &frames, 0), None);
        assert!(empty.calls.is_empty());
    }

    /// Test: Pixels on a raster surface
    /// Validates: Bars are backdrop colored, the frame fills the middle, watermark is gone
    #[test]
    fn test_raster_output() {
        // 40x70 frame: 40x30 red picture + 40px green watermark band
        let mut img = image::RgbaImage::from_pixel(40, 70, image::Rgba([255, 0, 0, 255]));
        for y in 30..70 {
            for x in 0..40 {
                img.put_pixel(x, y, image::Rgba([0, 255, 0, 255]));
            }
        }
        let frame = FrameAsset::from_rgba(img);

        let mut surface = RasterSurface::new(SurfaceSize::new(160, 60));
        let plan = Compositor::default().draw(&mut surface, &frame).unwrap();
        assert_eq!(plan.dest, Rect::new(40.0, 0.0, 80.0, 60.0));

        assert_eq!(surface.pixel(5, 30), Some(Color::BACKDROP));
        assert_eq!(surface.pixel(155, 30), Some(Color::BACKDROP));
        assert_eq!(surface.pixel(80, 30), Some(Color::rgb(255, 0, 0)));
        // Bottom row of the picture area shows no watermark green
        for x in 42..118 {
            assert_eq!(surface.pixel(x, 59).unwrap().g, 0, "watermark leaked at x={}", x);
        }
    }
}
