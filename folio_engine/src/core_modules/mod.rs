pub mod downsampler;
pub mod pointer;
pub mod prediction_display;
pub mod predictor;
pub mod raster_surface;
pub mod readiness;
pub mod sentiment;
pub mod stroke_rasterizer;
pub mod utils;
