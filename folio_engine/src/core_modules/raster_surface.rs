// THEORY:
// The `RasterSurface` is the paint buffer the user draws on. It is a "dumb" data
// container in the same spirit as a canvas backing store: it knows its size, it
// can be cleared, and it can fill an axis-aligned rectangle with white ink at a
// given opacity. It has no notion of strokes, grids or brushes; those belong to
// the `StrokeRasterizer`, which decides *where* to paint.
//
// Key architectural principles:
// 1.  **Ink Over Black**: The surface starts fully transparent black. Filling with
//     white at opacity `a` composites source-over onto that backdrop, so the RGB
//     channels carry the accumulated ink intensity (0 = untouched, 255 = solid).
//     Downstream consumers can read brightness straight from RGB without caring
//     about alpha, and a 70% neighbour really does arrive at the model as ~0.7.
// 2.  **Clipping, Not Rejection**: Rectangles that hang off an edge are clipped to
//     the buffer. Brush stamps near the border legitimately extend past it.
// 3.  **Backed by `image`**: The buffer is an `RgbaImage` so the downsampler and
//     the PNG helpers can hand it to `image` without copying.

use image::{Rgba, RgbaImage};

pub type Opacity = f32;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// An RGBA paint buffer that only ever receives white ink.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    buffer: RgbaImage,
}

impl RasterSurface {
    /// Creates an empty (transparent black) surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: RgbaImage::from_pixel(width, height, TRANSPARENT),
        }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Resets every pixel to transparent black.
    pub fn clear(&mut self) {
        for pixel in self.buffer.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    /// True when nothing has been painted since creation or the last `clear`.
    pub fn is_blank(&self) -> bool {
        self.buffer.pixels().all(|p| *p == TRANSPARENT)
    }

    /// Composites white ink over the square of side `size` whose top-left corner
    /// is at (`x`, `y`). Parts outside the surface are silently dropped.
    pub fn fill_square(&mut self, x: i32, y: i32, size: u32, opacity: Opacity) {
        let opacity = opacity.clamp(0.0, 1.0);
        if opacity == 0.0 || size == 0 {
            return;
        }

        let x0 = x.max(0) as i64;
        let y0 = y.max(0) as i64;
        let x1 = (x as i64 + size as i64).min(self.width() as i64);
        let y1 = (y as i64 + size as i64).min(self.height() as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        for py in y0..y1 {
            for px in x0..x1 {
                let pixel = self.buffer.get_pixel_mut(px as u32, py as u32);
                for channel in pixel.0.iter_mut() {
                    *channel = Self::composite_white(*channel, opacity);
                }
            }
        }
    }

    // Source-over of white onto one channel; alpha follows the same formula.
    fn composite_white(channel: u8, opacity: Opacity) -> u8 {
        let current = channel as f32;
        (current + (255.0 - current) * opacity).round().clamp(0.0, 255.0) as u8
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.buffer.get_pixel(x, y)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.buffer
    }

    /// The raw RGBA bytes, row-major.
    pub fn as_rgba(&self) -> &[u8] {
        self.buffer.as_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_surface_is_blank() {
        let surface = RasterSurface::new(280, 280);
        assert!(surface.is_blank());
        assert_eq!(surface.as_rgba().len(), 280 * 280 * 4);
    }

    #[test]
    fn full_opacity_fill_is_solid_white() {
        let mut surface = RasterSurface::new(30, 30);
        surface.fill_square(10, 10, 10, 1.0);
        assert_eq!(surface.pixel(10, 10), Rgba([255, 255, 255, 255]));
        assert_eq!(surface.pixel(19, 19), Rgba([255, 255, 255, 255]));
        assert_eq!(surface.pixel(20, 20), TRANSPARENT);
        assert_eq!(surface.pixel(9, 10), TRANSPARENT);
    }

    #[test]
    fn partial_opacity_accumulates_towards_white() {
        let mut surface = RasterSurface::new(10, 10);
        surface.fill_square(0, 0, 10, 0.7);
        let first = surface.pixel(0, 0).0[0];
        assert!((178..=179).contains(&first));
        surface.fill_square(0, 0, 10, 0.3);
        let second = surface.pixel(0, 0).0[0];
        assert!(second > first);
        assert!((201..=202).contains(&second));
    }

    #[test]
    fn fills_are_clipped_at_every_edge() {
        let mut surface = RasterSurface::new(20, 20);
        surface.fill_square(-5, -5, 10, 1.0);
        surface.fill_square(15, 15, 10, 1.0);
        assert_eq!(surface.pixel(0, 0).0[0], 255);
        assert_eq!(surface.pixel(4, 4).0[0], 255);
        assert_eq!(surface.pixel(5, 5).0[0], 0);
        assert_eq!(surface.pixel(19, 19).0[0], 255);

        // Entirely outside: nothing happens, nothing panics.
        surface.fill_square(-100, 0, 10, 1.0);
        surface.fill_square(0, 500, 10, 1.0);
    }

    #[test]
    fn clear_restores_blank() {
        let mut surface = RasterSurface::new(20, 20);
        surface.fill_square(0, 0, 10, 0.3);
        assert!(!surface.is_blank());
        surface.clear();
        assert!(surface.is_blank());
    }
}
