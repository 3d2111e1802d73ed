use miette::{IntoDiagnostic, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Tint painted over the whole background.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Overlay {
    Flat(Color),
    /// Vertical fade from `bottom` at the lower edge to `top` at the upper edge.
    Gradient { bottom: Color, top: Color },
}

impl Overlay {
    pub fn paint(&self, ctx: &cairo::Context, width: f64, height: f64) -> Result<()> {
        match self {
            Overlay::Flat(color) => color.set_source(ctx),
            Overlay::Gradient { bottom, top } => {
                let gradient = cairo::LinearGradient::new(0.0, height, 0.0, 0.0);
                gradient.add_color_stop_rgba(0.0, bottom.r, bottom.g, bottom.b, bottom.a);
                gradient.add_color_stop_rgba(1.0, top.r, top.g, top.b, top.a);
                ctx.set_source(&gradient).into_diagnostic()?;
            }
        }
        ctx.rectangle(0.0, 0.0, width, height);
        ctx.fill().into_diagnostic()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub title: Color,
    pub description: Color,
    /// Location line.
    pub accent: Color,
    pub agenda: Color,
    pub shadow: Color,
    /// Painted when there is no usable background image.
    pub fallback_background: Color,
    pub overlay: Overlay,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Social,
    ClassicDark,
    ModernClean,
    CyberNeon,
}

impl Theme {
    pub fn palette(self) -> Palette {
        let social = Palette {
            title: Color::WHITE,
            description: Color::WHITE,
            accent: Color::rgb8(0xfa, 0xcc, 0x15),
            agenda: Color::WHITE,
            shadow: Color::BLACK.with_alpha(0.8),
            fallback_background: Color::rgb8(0x1e, 0x29, 0x3b),
            overlay: Overlay::Flat(Color::BLACK.with_alpha(0.6)),
        };
        match self {
            Theme::Social => social,
            Theme::ClassicDark => Palette {
                description: Color::rgb8(0xe0, 0xe0, 0xe0),
                accent: Color::rgb8(0xff, 0xd7, 0x00),
                overlay: Overlay::Flat(Color::BLACK.with_alpha(0.5)),
                ..social
            },
            Theme::ModernClean => Palette {
                title: Color::rgb8(0x1a, 0x1a, 0x1a),
                description: Color::rgb8(0x33, 0x33, 0x33),
                accent: Color::rgb8(0xff, 0x45, 0x00),
                agenda: Color::rgb8(0x1a, 0x1a, 0x1a),
                shadow: Color::WHITE.with_alpha(0.6),
                overlay: Overlay::Flat(Color::WHITE.with_alpha(0.85)),
                ..social
            },
            Theme::CyberNeon => Palette {
                title: Color::rgb8(0x00, 0xff, 0x00),
                accent: Color::rgb8(0xff, 0x00, 0xff),
                overlay: Overlay::Gradient { bottom: Color::BLACK.with_alpha(0.9), top: Color::TRANSPARENT },
                ..social
            },
        }
    }
}

/// Per-field palette overrides from a render config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PaletteOverrides {
    pub title: Option<Color>,
    pub description: Option<Color>,
    pub accent: Option<Color>,
    pub agenda: Option<Color>,
    pub shadow: Option<Color>,
    pub fallback_background: Option<Color>,
    pub overlay: Option<Overlay>,
}

impl PaletteOverrides {
    pub fn apply(&self, base: Palette) -> Palette {
        Palette {
            title: self.title.unwrap_or(base.title),
            description: self.description.unwrap_or(base.description),
            accent: self.accent.unwrap_or(base.accent),
            agenda: self.agenda.unwrap_or(base.agenda),
            shadow: self.shadow.unwrap_or(base.shadow),
            fallback_background: self.fallback_background.unwrap_or(base.fallback_background),
            overlay: self.overlay.unwrap_or(base.overlay),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Overlay, PaletteOverrides, Theme};
    use crate::color::Color;

    #[test]
    fn decode_overlay_forms() {
        assert_eq!(
            Overlay::Flat(Color::BLACK.with_alpha(0.4)),
            serde_json::from_value::<Overlay>(json!("rgba(0,0,0,0.4)")).unwrap()
        );
        assert_eq!(
            Overlay::Gradient { bottom: Color::BLACK.with_alpha(0.9), top: Color::TRANSPARENT },
            serde_json::from_value::<Overlay>(json!({"bottom": "rgba(0,0,0,0.9)", "top": "transparent"})).unwrap()
        );
        assert!(serde_json::from_value::<Overlay>(json!("not a color")).is_err());
    }

    #[test]
    fn theme_names() {
        assert_eq!(Theme::CyberNeon, serde_json::from_value::<Theme>(json!("cyber-neon")).unwrap());
        assert_eq!(Theme::Social, Theme::default());
    }

    #[test]
    fn overrides_replace_single_fields() {
        let overrides: PaletteOverrides = serde_json::from_value(json!({"accent": "#ff0000"})).unwrap();
        let palette = overrides.apply(Theme::Social.palette());
        assert_eq!(Color::rgb8(0xff, 0, 0), palette.accent);
        assert_eq!(Theme::Social.palette().title, palette.title);
        assert_eq!(Theme::Social.palette().overlay, palette.overlay);
    }

    #[test]
    fn gradient_overlay_darkens_bottom_more() {
        let surface = cairo::ImageSurface::create(cairo::Format::Rgb24, 4, 100).unwrap();
        {
            let ctx = cairo::Context::new(&surface).unwrap();
            Color::WHITE.set_source(&ctx);
            ctx.paint().unwrap();
            Theme::CyberNeon.palette().overlay.paint(&ctx, 4.0, 100.0).unwrap();
        }
        let mut top = 0;
        let mut bottom = 0;
        surface
            .with_data(|data| {
                let stride = surface.stride() as usize;
                top = data[0] as u32;
                bottom = data[99 * stride] as u32;
            })
            .unwrap();
        assert!(bottom < top, "bottom {bottom} top {top}");
    }
}
