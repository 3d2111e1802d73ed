use std::path::Path;

use miette::{IntoDiagnostic, Result, WrapErr};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::layout::{LayoutParams, PosterContent};
use crate::output::OutputFormat;
use crate::theme::{Overlay, Palette, PaletteOverrides, Theme};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        CanvasSize { width: 1920, height: 1080 }
    }
}

/// Everything needed to render one poster.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RenderConfig {
    pub canvas: CanvasSize,
    pub content: PosterContent,
    /// http(s) URL, `data:` URI or local path.
    pub background: Option<String>,
    /// Seconds before a background download is abandoned.
    pub fetch_timeout_secs: u64,
    /// Replaces the theme's overlay. Either a color string or
    /// `{"bottom": <color>, "top": <color>}` for a vertical gradient.
    pub overlay: Option<Overlay>,
    pub theme: Theme,
    pub palette: PaletteOverrides,
    pub output: OutputFormat,
    pub layout: LayoutParams,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            canvas: CanvasSize::default(),
            content: PosterContent::default(),
            background: None,
            fetch_timeout_secs: 20,
            overlay: None,
            theme: Theme::default(),
            palette: PaletteOverrides::default(),
            output: OutputFormat::default(),
            layout: LayoutParams::default(),
        }
    }
}

impl RenderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&text).wrap_err_with(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: RenderConfig = serde_json::from_str(text)
            .into_diagnostic()
            .wrap_err("failed to parse render config")?;
        config.layout.validate()?;
        Ok(config)
    }

    /// Theme palette with the config's overrides applied; a top-level
    /// `overlay` wins over `palette.overlay`.
    pub fn palette(&self) -> Palette {
        let mut palette = self.palette.apply(self.theme.palette());
        if let Some(overlay) = self.overlay {
            palette.overlay = overlay;
        }
        palette
    }
}
