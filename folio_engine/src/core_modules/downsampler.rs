// THEORY:
// The `Downsampler` bridges the paint buffer and the model. The digit model takes a
// 28x28 grid of brightness values in [0, 1]; the surface is a 280x280 RGBA image.
// Because the rasterizer only ever paints whole cells, every 10x10 block of the
// surface is uniform and a nearest-neighbour resize loses nothing. Smoothing is
// deliberately off: a bilinear resize would bleed each cell into its neighbours
// and blur the blocky brush the model expects.
//
// Brightness is the plain mean of R, G and B divided by 255. The surface stores ink
// composited over black, so this is the ink intensity of the cell.

use crate::core_modules::raster_surface::RasterSurface;
use image::imageops::{self, FilterType};
use image::RgbaImage;

/// The normalized model input, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct InputVector {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f32>,
}

impl InputVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when no cell carries any ink.
    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values.get((y * self.width + x) as usize).copied()
    }
}

pub struct Downsampler {
    width: u32,
    height: u32,
}

impl Downsampler {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Resizes the surface to the model resolution without smoothing.
    pub fn resample(&self, surface: &RasterSurface) -> RgbaImage {
        imageops::resize(surface.image(), self.width, self.height, FilterType::Nearest)
    }

    /// Produces the `width * height` brightness vector for the predictor.
    pub fn downsample(&self, surface: &RasterSurface) -> InputVector {
        let small = self.resample(surface);
        let values = small
            .pixels()
            .map(|p| {
                let [r, g, b, _] = p.0;
                (r as f32 + g as f32 + b as f32) / (3.0 * 255.0)
            })
            .collect();
        InputVector {
            width: self.width,
            height: self.height,
            values,
        }
    }
}
