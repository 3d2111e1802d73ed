use serde::Serialize;

use crate::metrics::{FontSpec, TextMetrics};
use crate::wrap::wrap;

/// Lists longer than this are split into two columns.
pub const SINGLE_COLUMN_LIMIT: usize = 4;

/// Agenda entries in chronological order: trimmed, blank lines dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgendaList {
    items: Vec<String>,
}

impl AgendaList {
    pub fn parse(text: &str) -> Self {
        AgendaList {
            items: text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnMode {
    Single,
    Double,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balanced<'a, T> {
    pub mode: ColumnMode,
    pub columns: Vec<&'a [T]>,
}

/// Splits by index: the left column takes `ceil(n / 2)` entries. Line lengths
/// are not considered, so rendered column heights may differ.
pub fn balance<T>(lines: &[T]) -> Balanced<'_, T> {
    if lines.len() <= SINGLE_COLUMN_LIMIT {
        Balanced { mode: ColumnMode::Single, columns: vec![lines] }
    } else {
        let (left, right) = lines.split_at(lines.len().div_ceil(2));
        Balanced { mode: ColumnMode::Double, columns: vec![left, right] }
    }
}

/// Width limits for the agenda block at one scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgendaGeometry {
    /// Wrap width for each entry in single-column mode.
    pub single_width: f64,
    /// Upper bound for one column in double-column mode.
    pub column_budget: f64,
    pub column_gap: f64,
    pub column_padding: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgendaColumn {
    pub items: Vec<String>,
    /// Wrap width, also the horizontal space the column occupies.
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgendaLayout {
    pub mode: ColumnMode,
    pub font: FontSpec,
    pub line_height: f64,
    pub column_gap: f64,
    pub columns: Vec<AgendaColumn>,
    pub width: f64,
    pub height: f64,
}

impl AgendaLayout {
    /// Left edge of each column when the block is centered on a canvas of
    /// `canvas_width`. Single-column entries are centered individually, so
    /// the single column reports the canvas center instead.
    pub fn column_origins(&self, canvas_width: f64) -> Vec<f64> {
        match self.mode {
            ColumnMode::Single => vec![canvas_width / 2.0],
            ColumnMode::Double => {
                let mut x = (canvas_width - self.width) / 2.0;
                self.columns
                    .iter()
                    .map(|col| {
                        let origin = x;
                        x += col.width + self.column_gap;
                        origin
                    })
                    .collect()
            }
        }
    }
}

fn column_height<M: TextMetrics + ?Sized>(
    metrics: &M,
    items: &[String],
    font: &FontSpec,
    width: f64,
    line_height: f64,
) -> f64 {
    items.iter().map(|item| wrap(metrics, item, font, width, line_height).height).sum()
}

/// Balances `items` and measures the resulting columns. Returns `None` for an
/// empty list.
pub fn measure<M: TextMetrics + ?Sized>(
    metrics: &M,
    items: &[String],
    font: &FontSpec,
    line_height: f64,
    geometry: &AgendaGeometry,
) -> Option<AgendaLayout> {
    if items.is_empty() {
        return None;
    }
    let balanced = balance(items);

    let columns: Vec<AgendaColumn> = match balanced.mode {
        ColumnMode::Single => {
            let width = geometry.single_width;
            vec![AgendaColumn {
                items: items.to_vec(),
                width,
                height: column_height(metrics, items, font, width, line_height),
            }]
        }
        ColumnMode::Double => balanced
            .columns
            .iter()
            .map(|col| {
                // measured with the trailing space the wrapper adds, so the
                // widest entry stays on one line
                let natural = col
                    .iter()
                    .map(|item| metrics.measure_width(&format!("{item} "), font))
                    .fold(0.0, f64::max);
                let width = (natural + geometry.column_padding).min(geometry.column_budget);
                AgendaColumn {
                    items: col.to_vec(),
                    width,
                    height: column_height(metrics, col, font, width, line_height),
                }
            })
            .collect(),
    };

    let (width, height, column_gap) = match balanced.mode {
        ColumnMode::Single => (columns[0].width, columns[0].height, 0.0),
        ColumnMode::Double => (
            columns.iter().map(|c| c.width).sum::<f64>() + geometry.column_gap,
            columns.iter().map(|c| c.height).fold(0.0, f64::max),
            geometry.column_gap,
        ),
    };

    Some(AgendaLayout {
        mode: balanced.mode,
        font: font.clone(),
        line_height,
        column_gap,
        columns,
        width,
        height,
    })
}
