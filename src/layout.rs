//! Poster content, text blocks and the constants the fit search works with.

use miette::{miette, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference canvas the width ratios below were tuned against.
const REFERENCE_WIDTH: f64 = 1920.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Title,
    Description,
    Location,
    Agenda,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub kind: BlockKind,
    pub content: String,
    pub font_family: String,
    pub base_font_size: u32,
    pub base_line_height: u32,
    pub bold: bool,
}

/// What the user typed into the poster form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PosterContent {
    pub title: String,
    pub description: String,
    pub location: String,
    /// One entry per line.
    pub agenda: String,
}

impl PosterContent {
    /// The title is always present; other blocks only when they have text.
    pub fn blocks(&self, params: &LayoutParams) -> Vec<TextBlock> {
        let mut blocks = vec![params.title.block(BlockKind::Title, &self.title)];
        if !self.description.trim().is_empty() {
            blocks.push(params.description.block(BlockKind::Description, &self.description));
        }
        if !self.location.trim().is_empty() {
            blocks.push(params.location.block(BlockKind::Location, &self.location));
        }
        if !self.agenda.trim().is_empty() {
            blocks.push(params.agenda.block(&self.agenda));
        }
        blocks
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BlockStyle {
    pub font_family: String,
    pub font_size: u32,
    pub line_height: u32,
    pub bold: bool,
    /// Maximum line width as a fraction of the canvas width.
    pub max_width_ratio: f64,
}

impl BlockStyle {
    fn block(&self, kind: BlockKind, content: &str) -> TextBlock {
        TextBlock {
            kind,
            content: content.to_owned(),
            font_family: self.font_family.clone(),
            base_font_size: self.font_size,
            base_line_height: self.line_height,
            bold: self.bold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgendaTier {
    /// Applies when the list has more entries than this.
    pub more_than: usize,
    pub font_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AgendaParams {
    pub font_family: String,
    /// Base size for short lists.
    pub font_size: u32,
    /// Smaller base sizes for denser lists.
    pub tiers: Vec<AgendaTier>,
    pub line_height_ratio: f64,
    pub bold: bool,
    /// Wrap width of single-column entries, as a fraction of the canvas width.
    pub single_width_ratio: f64,
    /// Two-column block width is `base + per_scale * scale` of the canvas width.
    pub double_width_ratio_base: f64,
    pub double_width_ratio_per_scale: f64,
    pub column_gap: f64,
    pub column_padding: f64,
}

impl Default for AgendaParams {
    fn default() -> Self {
        AgendaParams {
            font_family: "monospace".to_owned(),
            font_size: 45,
            tiers: vec![
                AgendaTier { more_than: 12, font_size: 30 },
                AgendaTier { more_than: 8, font_size: 36 },
            ],
            line_height_ratio: 1.5,
            bold: false,
            single_width_ratio: 1200.0 / REFERENCE_WIDTH,
            double_width_ratio_base: 0.50,
            double_width_ratio_per_scale: 0.35,
            column_gap: 60.0,
            column_padding: 20.0,
        }
    }
}

impl AgendaParams {
    /// Unscaled font size for a list of `count` entries whose block asks for
    /// `base`. A tier can only make the text smaller.
    pub fn base_size_for(&self, count: usize, base: u32) -> u32 {
        self.tiers
            .iter()
            .filter(|tier| count > tier.more_than)
            .max_by_key(|tier| tier.more_than)
            .map_or(base, |tier| tier.font_size.min(base))
    }

    fn block(&self, content: &str) -> TextBlock {
        TextBlock {
            kind: BlockKind::Agenda,
            content: content.to_owned(),
            font_family: self.font_family.clone(),
            base_font_size: self.font_size,
            base_line_height: (f64::from(self.font_size) * self.line_height_ratio).round() as u32,
            bold: self.bold,
        }
    }
}

/// Vertical gaps between blocks, before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Gaps {
    pub after_title: f64,
    pub after_description: f64,
    pub before_agenda: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SearchParams {
    pub step: f64,
    pub max_iterations: u32,
    /// The scale never goes below this, whatever `step` and `max_iterations`
    /// would allow.
    pub min_scale: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams { step: 0.08, max_iterations: 15, min_scale: 0.1 }
    }
}

impl SearchParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(miette!("search step must be a positive number, got {}", self.step));
        }
        if !(self.min_scale > 0.0 && self.min_scale <= 1.0) {
            return Err(miette!("search min_scale must be in (0, 1], got {}", self.min_scale));
        }
        if self.max_iterations == 0 {
            return Err(miette!("search max_iterations must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LayoutParams {
    pub title: BlockStyle,
    pub description: BlockStyle,
    pub location: BlockStyle,
    pub agenda: AgendaParams,
    pub gaps: Gaps,
    pub search: SearchParams,
    /// Space kept free below the stacked blocks.
    pub bottom_margin: f64,
    /// The block group is never placed higher than this.
    pub min_top_margin: f64,
    /// Prefixed to the location text.
    pub location_glyph: String,
}

impl Default for LayoutParams {
    fn default() -> Self {
        LayoutParams {
            title: BlockStyle {
                font_family: "sans-serif".to_owned(),
                font_size: 160,
                line_height: 170,
                bold: true,
                max_width_ratio: 1600.0 / REFERENCE_WIDTH,
            },
            description: BlockStyle {
                font_family: "sans-serif".to_owned(),
                font_size: 50,
                line_height: 60,
                bold: false,
                max_width_ratio: 1400.0 / REFERENCE_WIDTH,
            },
            location: BlockStyle {
                font_family: "sans-serif".to_owned(),
                font_size: 40,
                line_height: 50,
                bold: true,
                max_width_ratio: 1400.0 / REFERENCE_WIDTH,
            },
            agenda: AgendaParams::default(),
            gaps: Gaps { after_title: 40.0, after_description: 30.0, before_agenda: 60.0 },
            search: SearchParams::default(),
            bottom_margin: 150.0,
            min_top_margin: 50.0,
            location_glyph: "📍".to_owned(),
        }
    }
}

impl LayoutParams {
    pub fn validate(&self) -> Result<()> {
        self.search.validate()
    }

    pub fn style(&self, kind: BlockKind) -> Option<&BlockStyle> {
        match kind {
            BlockKind::Title => Some(&self.title),
            BlockKind::Description => Some(&self.description),
            BlockKind::Location => Some(&self.location),
            BlockKind::Agenda => None,
        }
    }
}
