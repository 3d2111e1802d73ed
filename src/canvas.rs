use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use miette::{IntoDiagnostic, Result, WrapErr};

use crate::output::OutputFormat;

/// Fixed-size drawing surface. Owned by the caller and repainted in full by
/// every render.
#[derive(Debug)]
pub struct Canvas {
    surface: cairo::ImageSurface,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let surface = cairo::ImageSurface::create(
            cairo::Format::Rgb24,
            i32::try_from(width).into_diagnostic()?,
            i32::try_from(height).into_diagnostic()?,
        )
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to allocate {width}x{height} canvas"))?;
        Ok(Canvas { surface })
    }

    pub fn width(&self) -> u32 {
        self.surface.width() as u32
    }

    pub fn height(&self) -> u32 {
        self.surface.height() as u32
    }

    /// A fresh drawing context with an identity transform.
    pub fn context(&self) -> Result<cairo::Context> {
        cairo::Context::new(&self.surface).into_diagnostic()
    }

    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        let width = self.width();
        let height = self.height();
        let stride = self.surface.stride() as usize;
        let mut out = RgbImage::new(width, height);
        self.surface
            .with_data(|data| {
                for (y, row) in data.chunks(stride).take(height as usize).enumerate() {
                    for (x, px) in row.chunks_exact(4).take(width as usize).enumerate() {
                        let v = u32::from_ne_bytes([px[0], px[1], px[2], px[3]]);
                        let rgb = Rgb([(v >> 16) as u8, (v >> 8) as u8, v as u8]);
                        out.put_pixel(x as u32, y as u32, rgb);
                    }
                }
            })
            .into_diagnostic()
            .wrap_err("failed to read canvas pixels")?;
        Ok(out)
    }

    pub fn encode(&self, format: OutputFormat) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        match format {
            OutputFormat::Jpeg { quality } => {
                let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
                self.to_rgb_image()?
                    .write_with_encoder(encoder)
                    .into_diagnostic()
                    .wrap_err("failed to encode jpeg")?;
            }
            OutputFormat::Png => {
                self.surface
                    .write_to_png(&mut bytes)
                    .into_diagnostic()
                    .wrap_err("failed to encode png")?;
            }
        }
        Ok(bytes)
    }
}

/// Placement that scales an image to cover the whole canvas, keeping its
/// aspect ratio and cropping the overflow evenly on both sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverFit {
    pub scale: f64,
    pub x: f64,
    pub y: f64,
}

impl CoverFit {
    pub fn new((image_w, image_h): (f64, f64), (canvas_w, canvas_h): (f64, f64)) -> Self {
        let scale = f64::max(canvas_w / image_w, canvas_h / image_h);
        CoverFit {
            scale,
            x: canvas_w / 2.0 - image_w / 2.0 * scale,
            y: canvas_h / 2.0 - image_h / 2.0 * scale,
        }
    }
}
