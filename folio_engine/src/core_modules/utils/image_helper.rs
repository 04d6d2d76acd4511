pub mod image_helper {
    use crate::core_modules::downsampler::InputVector;
    use crate::core_modules::raster_surface::RasterSurface;
    use image::ImageEncoder;
    use std::path::Path;

    pub fn save(
        path: &Path,
        width: u32,
        height: u32,
        buffer: &[u8],
        color: image::ExtendedColorType,
    ) -> Result<(), image::error::ImageError> {
        let output = std::fs::File::create(path)?;
        let encoder = image::codecs::png::PngEncoder::new(output);

        encoder.write_image(buffer, width, height, color)?;

        Ok(())
    }

    /// Writes the full-resolution paint buffer as an RGBA PNG.
    pub fn save_surface(path: &Path, surface: &RasterSurface) -> Result<(), image::error::ImageError> {
        save(
            path,
            surface.width(),
            surface.height(),
            surface.as_rgba(),
            image::ExtendedColorType::Rgba8,
        )
    }

    /// Writes the model input as an 8-bit grayscale PNG, i.e. what the model "sees".
    pub fn save_input(path: &Path, input: &InputVector) -> Result<(), image::error::ImageError> {
        let gray: Vec<u8> = input
            .values
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        save(path, input.width, input.height, &gray, image::ExtendedColorType::L8)
    }
}
