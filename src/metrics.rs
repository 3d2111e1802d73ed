use miette::{IntoDiagnostic, Result, WrapErr};
use pango::prelude::*;
use serde::Serialize;

use crate::color::Color;

/// Family used when the requested one is not installed.
pub const DEFAULT_FAMILY: &str = "sans-serif";

/// Fontconfig aliases that always resolve to something.
const GENERIC_FAMILIES: &[&str] = &["sans-serif", "sans", "serif", "monospace", "mono"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontSpec {
    pub family: String,
    pub size_px: f64,
    pub bold: bool,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size_px: f64, bold: bool) -> Self {
        FontSpec { family: family.into(), size_px, bold }
    }
}

/// Width measurement for a single line of text. Measuring and drawing must go
/// through the same implementation or the fit result stops meaning anything.
pub trait TextMetrics {
    fn measure_width(&self, text: &str, font: &FontSpec) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub color: Color,
    pub blur: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPaint {
    pub fill: Color,
    pub shadow: Option<Shadow>,
}

/// Pango-backed text measuring and drawing. One layout object serves both
/// passes.
pub struct PangoText {
    layout: pango::Layout,
    families: Vec<String>,
}

impl PangoText {
    pub fn new() -> Result<Self> {
        let scratch = cairo::ImageSurface::create(cairo::Format::ARgb32, 1, 1)
            .into_diagnostic()
            .wrap_err("failed to create scratch surface for text measurement")?;
        let ctx = cairo::Context::new(&scratch).into_diagnostic()?;
        let layout = pangocairo::create_layout(&ctx);

        let families = layout
            .context()
            .font_map()
            .map(|font_map| {
                font_map
                    .list_families()
                    .iter()
                    .map(|family| family.name().to_lowercase())
                    .collect()
            })
            .unwrap_or_default();

        Ok(PangoText { layout, families })
    }

    /// Returns `family` if it can be rendered, otherwise [`DEFAULT_FAMILY`].
    pub fn resolve_family<'a>(&self, family: &'a str) -> &'a str {
        let wanted = family.trim().to_lowercase();
        if GENERIC_FAMILIES.contains(&wanted.as_str()) || self.families.iter().any(|f| *f == wanted) {
            family
        } else {
            DEFAULT_FAMILY
        }
    }

    fn apply(&self, text: &str, font: &FontSpec) {
        let mut desc = pango::FontDescription::new();
        desc.set_family(self.resolve_family(&font.family));
        desc.set_weight(if font.bold { pango::Weight::Bold } else { pango::Weight::Normal });
        desc.set_absolute_size(font.size_px * f64::from(pango::SCALE));
        self.layout.set_font_description(Some(&desc));
        self.layout.set_text(text);
    }

    /// Draws one line with its top-left corner at `(x, y)`.
    pub fn draw_line(
        &self,
        ctx: &cairo::Context,
        text: &str,
        font: &FontSpec,
        (x, y): (f64, f64),
        paint: &TextPaint,
    ) -> Result<()> {
        self.apply(text, font);
        pangocairo::update_layout(ctx, &self.layout);

        if let Some(shadow) = paint.shadow.filter(|s| s.blur > 0.0) {
            self.draw_shadow(ctx, (x, y), shadow)?;
        }

        paint.fill.set_source(ctx);
        ctx.move_to(x, y);
        pangocairo::layout_path(ctx, &self.layout);
        ctx.fill().into_diagnostic()?;
        Ok(())
    }

    /// Gaussian-blurred copy of the current layout's glyphs, `blur` read the
    /// way a canvas `shadowBlur` is (sigma = blur / 2).
    fn draw_shadow(&self, ctx: &cairo::Context, (x, y): (f64, f64), shadow: Shadow) -> Result<()> {
        let (ink, _) = self.layout.pixel_extents();
        if ink.width() <= 0 || ink.height() <= 0 {
            return Ok(());
        }
        let sigma = shadow.blur / 2.0;
        let pad = (sigma * 3.0).ceil() as i32 + 1;
        let width = ink.width() + 2 * pad;
        let height = ink.height() + 2 * pad;

        let mut mask = cairo::ImageSurface::create(cairo::Format::A8, width, height)
            .into_diagnostic()
            .wrap_err("failed to allocate shadow mask")?;
        {
            let mask_ctx = cairo::Context::new(&mask).into_diagnostic()?;
            mask_ctx.move_to(f64::from(pad - ink.x()), f64::from(pad - ink.y()));
            pangocairo::layout_path(&mask_ctx, &self.layout);
            mask_ctx.fill().into_diagnostic()?;
        }

        let (w, h) = (width as u32, height as u32);
        let stride = mask.stride() as usize;
        {
            let mut data = mask.data().into_diagnostic()?;
            let mut coverage = image::GrayImage::new(w, h);
            for (row_y, row) in data.chunks(stride).take(h as usize).enumerate() {
                for (col_x, &a) in row.iter().take(w as usize).enumerate() {
                    coverage.put_pixel(col_x as u32, row_y as u32, image::Luma([a]));
                }
            }
            let blurred = image::imageops::blur(&coverage, sigma as f32);
            for (row_y, row) in data.chunks_mut(stride).take(h as usize).enumerate() {
                for (col_x, a) in row.iter_mut().take(w as usize).enumerate() {
                    *a = blurred.get_pixel(col_x as u32, row_y as u32).0[0];
                }
            }
        }

        shadow.color.set_source(ctx);
        ctx.mask_surface(&mask, x + f64::from(ink.x() - pad), y + f64::from(ink.y() - pad))
            .into_diagnostic()
    }
}

impl TextMetrics for PangoText {
    fn measure_width(&self, text: &str, font: &FontSpec) -> f64 {
        if text.is_empty() {
            return 0.0;
        }
        self.apply(text, font);
        let (_, logical) = self.layout.extents();
        pango::units_to_double(logical.width())
    }
}

/// Every character advances by `ratio * size_px`.
#[cfg(test)]
pub(crate) struct FixedAdvance {
    pub ratio: f64,
}

#[cfg(test)]
impl TextMetrics for FixedAdvance {
    fn measure_width(&self, text: &str, font: &FontSpec) -> f64 {
        text.chars().count() as f64 * font.size_px * self.ratio
    }
}
