//! The auto-fit search: finds the largest uniform scale at which the stacked
//! blocks fit the canvas height.

use serde::Serialize;

use crate::agenda::{self, AgendaGeometry, AgendaLayout, AgendaList};
use crate::layout::{BlockKind, LayoutParams, TextBlock};
use crate::metrics::{FontSpec, TextMetrics};
use crate::wrap::wrap;

/// One measured text block at the solved scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockFit {
    pub kind: BlockKind,
    /// Text as drawn: title uppercased, location with its glyph.
    pub text: String,
    pub font: FontSpec,
    pub line_height: f64,
    pub max_width: f64,
    pub line_count: usize,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaledGaps {
    pub after_title: f64,
    pub after_description: f64,
    pub before_agenda: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placed<'a> {
    Text(&'a BlockFit),
    Agenda(&'a AgendaLayout),
}

impl Placed<'_> {
    pub fn kind(&self) -> BlockKind {
        match self {
            Placed::Text(block) => block.kind,
            Placed::Agenda(_) => BlockKind::Agenda,
        }
    }

    pub fn height(&self) -> f64 {
        match self {
            Placed::Text(block) => block.height,
            Placed::Agenda(agenda) => agenda.height,
        }
    }
}

/// Frozen solver output; the drawing pass uses it unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    pub scale: f64,
    /// Number of times the scale was stepped down.
    pub steps: u32,
    /// Whether `total_height` is inside the vertical budget.
    pub fits: bool,
    pub title: Option<BlockFit>,
    pub description: Option<BlockFit>,
    pub location: Option<BlockFit>,
    pub agenda: Option<AgendaLayout>,
    pub gaps: ScaledGaps,
    pub total_height: f64,
}

impl FitResult {
    /// Blocks in drawing order with their offsets from the top of the group.
    /// Zero-height blocks are skipped along with the gap that would lead
    /// into them.
    pub fn stack(&self) -> Vec<(f64, Placed<'_>)> {
        let present = [
            self.title.as_ref().map(Placed::Text),
            self.description.as_ref().map(Placed::Text),
            self.location.as_ref().map(Placed::Text),
            self.agenda.as_ref().map(Placed::Agenda),
        ];

        let mut out: Vec<(f64, Placed<'_>)> = Vec::with_capacity(4);
        let mut y = 0.0;
        for placed in present.into_iter().flatten().filter(|p| p.height() > 0.0) {
            if let Some((_, prev)) = out.last() {
                y += self.gap_between(prev.kind(), placed.kind());
            }
            out.push((y, placed));
            y += placed.height();
        }
        out
    }

    fn gap_between(&self, prev: BlockKind, next: BlockKind) -> f64 {
        if next == BlockKind::Agenda {
            return self.gaps.before_agenda;
        }
        match prev {
            BlockKind::Description => self.gaps.after_description,
            _ => self.gaps.after_title,
        }
    }

    fn stacked_height(&self) -> f64 {
        self.stack().last().map_or(0.0, |(top, placed)| top + placed.height())
    }
}

fn scaled(base: u32, scale: f64) -> u32 {
    (f64::from(base) * scale).round().max(1.0) as u32
}

pub struct Solver<'a, M: ?Sized> {
    metrics: &'a M,
    params: &'a LayoutParams,
}

impl<'a, M: TextMetrics + ?Sized> Solver<'a, M> {
    pub fn new(metrics: &'a M, params: &'a LayoutParams) -> Self {
        Solver { metrics, params }
    }

    /// Scale tried after `steps` decrements. Never above 1.0; see
    /// [`SearchParams::validate`](crate::layout::SearchParams::validate) for
    /// the parameters that keep it above zero.
    pub fn scale_at(&self, steps: u32) -> f64 {
        let search = &self.params.search;
        (1.0 - search.step * f64::from(steps)).max(search.min_scale).min(1.0)
    }

    /// Last step index the search may reach.
    fn max_steps(&self) -> u32 {
        let search = &self.params.search;
        let mut last = search.max_iterations.saturating_sub(1);
        while last > 0 && 1.0 - search.step * f64::from(last) < search.min_scale {
            last -= 1;
        }
        last
    }

    /// Searches from scale 1.0 downwards for the first scale at which the
    /// blocks fit. Agenda entries are taken into account one at a time and
    /// the scale never goes back up, so a longer agenda can never end with a
    /// larger scale than a shorter one. When the step budget runs out the
    /// smallest tried scale is used even if the blocks still overflow.
    ///
    /// Because of that walk the result can be smaller than the largest scale
    /// at which the full content would fit: a short prefix that overflows at
    /// a big agenda font pushes the scale down before a longer list drops to
    /// a smaller tier.
    pub fn solve(&self, blocks: &[TextBlock], canvas_width: f64, canvas_height: f64) -> FitResult {
        let agenda = blocks
            .iter()
            .find(|b| b.kind == BlockKind::Agenda)
            .map(|b| AgendaList::parse(&b.content))
            .unwrap_or_default();
        let items = agenda.items();
        let max_steps = self.max_steps();

        let mut steps = 0;
        for prefix in 0..=items.len() {
            while steps < max_steps {
                let trial = self.measure_at(steps, blocks, &items[..prefix], canvas_width, canvas_height);
                tracing::debug!(
                    scale = trial.scale,
                    agenda_entries = prefix,
                    total_height = trial.total_height,
                    fits = trial.fits,
                    "fit trial"
                );
                if trial.fits {
                    break;
                }
                steps += 1;
            }
        }

        let result = self.measure_at(steps, blocks, items, canvas_width, canvas_height);
        if !result.fits {
            tracing::warn!(
                scale = result.scale,
                total_height = result.total_height,
                canvas_height,
                "content does not fit even at the smallest scale"
            );
        }
        result
    }

    /// Measures every block at the scale reached after `steps` decrements.
    pub fn measure_at(
        &self,
        steps: u32,
        blocks: &[TextBlock],
        agenda_items: &[String],
        canvas_width: f64,
        canvas_height: f64,
    ) -> FitResult {
        let scale = self.scale_at(steps);
        let params = self.params;
        let find = |kind| blocks.iter().find(|b: &&TextBlock| b.kind == kind);

        let measure_text = |block: &TextBlock, text: String| -> Option<BlockFit> {
            if text.trim().is_empty() {
                return None;
            }
            let ratio = params.style(block.kind).map_or(1.0, |s| s.max_width_ratio);
            let font = FontSpec::new(&block.font_family, f64::from(scaled(block.base_font_size, scale)), block.bold);
            let line_height = f64::from(scaled(block.base_line_height, scale));
            let max_width = canvas_width * ratio;
            let paragraph = wrap(self.metrics, &text, &font, max_width, line_height);
            Some(BlockFit {
                kind: block.kind,
                text,
                font,
                line_height,
                max_width,
                line_count: paragraph.line_count,
                height: paragraph.height,
            })
        };

        let title = find(BlockKind::Title).and_then(|b| measure_text(b, b.content.trim().to_uppercase()));
        let description = find(BlockKind::Description).and_then(|b| measure_text(b, b.content.trim().to_owned()));
        let location = find(BlockKind::Location).and_then(|b| {
            let content = b.content.trim();
            if content.is_empty() {
                return None;
            }
            let text = match params.location_glyph.as_str() {
                "" => content.to_owned(),
                glyph => format!("{glyph} {content}"),
            };
            measure_text(b, text)
        });

        let agenda = find(BlockKind::Agenda).and_then(|b| {
            let ap = &params.agenda;
            let base = b.base_font_size.max(1);
            let size = scaled(ap.base_size_for(agenda_items.len(), base), scale);
            let font = FontSpec::new(&b.font_family, f64::from(size), b.bold);
            // the block's line height is for its base size; keep the ratio
            let line_height = (f64::from(size) * f64::from(b.base_line_height) / f64::from(base)).round();
            let column_gap = ap.column_gap * scale;
            let block_width = canvas_width * (ap.double_width_ratio_base + ap.double_width_ratio_per_scale * scale);
            let geometry = AgendaGeometry {
                single_width: canvas_width * ap.single_width_ratio,
                column_budget: (block_width - column_gap) / 2.0,
                column_gap,
                column_padding: ap.column_padding,
            };
            agenda::measure(self.metrics, agenda_items, &font, line_height, &geometry)
        });

        let gaps = ScaledGaps {
            after_title: (params.gaps.after_title * scale).round(),
            after_description: (params.gaps.after_description * scale).round(),
            before_agenda: (params.gaps.before_agenda * scale).round(),
        };

        let mut result = FitResult {
            scale,
            steps,
            fits: false,
            title,
            description,
            location,
            agenda,
            gaps,
            total_height: 0.0,
        };
        result.total_height = result.stacked_height();
        result.fits = result.total_height < canvas_height - params.bottom_margin;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::{FitResult, Placed, Solver};
    use crate::agenda::ColumnMode;
    use crate::layout::{BlockKind, LayoutParams, PosterContent, SearchParams, TextBlock};
    use crate::metrics::FixedAdvance;

    const METRICS: FixedAdvance = FixedAdvance { ratio: 0.5 };

    fn solve(content: &PosterContent, params: &LayoutParams) -> FitResult {
        Solver::new(&METRICS, params).solve(&content.blocks(params), 1920.0, 1080.0)
    }

    fn agenda(n: usize) -> String {
        (0..n)
            .map(|i| format!("{:02}:{:02} - Sessione pratica di biologia marina numero {i}", 9 + i / 2, (i % 2) * 30))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn full_content(agenda_entries: usize) -> PosterContent {
        PosterContent {
            title: "Ustica Blue Lab".to_owned(),
            description: "Summer School teorico-pratica in Biologia Marina Applicata nelle Aree Marine Protette, \
                          con laboratori quotidiani, immersioni guidate e seminari serali aperti al pubblico"
                .to_owned(),
            location: "Area Marina Protetta Isola di Ustica - Piazza Umberto I, Ustica".to_owned(),
            agenda: agenda(agenda_entries),
        }
    }

    #[test]
    fn title_only_fits_at_full_scale() {
        let content = PosterContent { title: "USTICA BLUE LAB".to_owned(), ..Default::default() };
        let fit = solve(&content, &LayoutParams::default());
        assert_eq!(1.0, fit.scale);
        assert_eq!(0, fit.steps);
        assert!(fit.fits);
        assert!(fit.description.is_none() && fit.location.is_none() && fit.agenda.is_none());

        let title = fit.title.as_ref().unwrap();
        assert_eq!(160.0, title.font.size_px);
        assert_eq!(170.0, title.line_height);
        assert_eq!(1, title.line_count);
        assert_eq!(170.0, fit.total_height);

        let stack = fit.stack();
        assert_eq!(1, stack.len());
        assert_eq!(0.0, stack[0].0);
        assert!(matches!(stack[0].1, Placed::Text(b) if b.kind == BlockKind::Title));
    }

    #[test]
    fn title_is_uppercased_and_location_prefixed() {
        let content = PosterContent {
            title: "Ustica blue lab".to_owned(),
            location: "Ustica".to_owned(),
            ..Default::default()
        };
        let fit = solve(&content, &LayoutParams::default());
        assert_eq!("USTICA BLUE LAB", fit.title.unwrap().text);
        assert_eq!("📍 Ustica", fit.location.unwrap().text);
    }

    #[test]
    fn dense_poster_uses_two_columns_and_shrinks() {
        let fit = solve(&full_content(14), &LayoutParams::default());
        let agenda = fit.agenda.as_ref().unwrap();
        assert_eq!(ColumnMode::Double, agenda.mode);
        assert_eq!(7, agenda.columns[0].items.len());
        assert_eq!(7, agenda.columns[1].items.len());
        assert!(fit.scale < 1.0, "scale {}", fit.scale);
        assert!(fit.fits);
        assert!(fit.total_height < 1080.0 - 150.0);
        // 14 entries start from the smallest tier
        assert_eq!((30.0 * fit.scale).round(), agenda.font.size_px);
    }

    #[test]
    fn stack_offsets_include_scaled_gaps() {
        let fit = solve(&full_content(3), &LayoutParams::default());
        let stack = fit.stack();
        let kinds: Vec<BlockKind> = stack.iter().map(|(_, p)| p.kind()).collect();
        assert_eq!(
            vec![BlockKind::Title, BlockKind::Description, BlockKind::Location, BlockKind::Agenda],
            kinds
        );
        let title_h = fit.title.as_ref().unwrap().height;
        let desc_h = fit.description.as_ref().unwrap().height;
        assert_eq!(title_h + fit.gaps.after_title, stack[1].0);
        assert_eq!(title_h + fit.gaps.after_title + desc_h + fit.gaps.after_description, stack[2].0);
        let (last_top, last) = stack[3];
        assert_eq!(fit.total_height, last_top + last.height());
    }

    #[test]
    fn solving_is_deterministic() {
        let params = LayoutParams::default();
        let content = full_content(11);
        assert_eq!(solve(&content, &params), solve(&content, &params));
    }

    #[test]
    fn more_agenda_entries_never_raise_scale() {
        let params = LayoutParams::default();
        let mut previous = f64::INFINITY;
        for n in 0..=24 {
            let fit = solve(&full_content(n), &params);
            assert!(fit.scale <= previous, "{n} entries: {} > {}", fit.scale, previous);
            previous = fit.scale;
        }
    }

    #[test]
    fn exhausted_search_keeps_smallest_scale() {
        let params = LayoutParams {
            search: SearchParams { step: 0.08, max_iterations: 4, min_scale: 0.1 },
            ..Default::default()
        };
        let fit = solve(&full_content(40), &params);
        assert_eq!(3, fit.steps);
        assert!((fit.scale - 0.76).abs() < 1e-9);
        assert!(!fit.fits);
    }

    #[test]
    fn scale_never_exceeds_one() {
        let params = LayoutParams {
            search: SearchParams { step: -0.08, max_iterations: 15, min_scale: 0.1 },
            ..Default::default()
        };
        let solver = Solver::new(&METRICS, &params);
        assert_eq!(1.0, solver.scale_at(0));
        assert_eq!(1.0, solver.scale_at(14));
        let content = PosterContent { title: "word ".repeat(400), ..Default::default() };
        let fit = solver.solve(&content.blocks(&params), 1920.0, 1080.0);
        assert!(fit.scale <= 1.0, "scale {}", fit.scale);
    }

    #[test]
    fn agenda_sizes_come_from_the_block() {
        let params = LayoutParams::default();
        let blocks = vec![
            TextBlock {
                kind: BlockKind::Title,
                content: "Ustica".to_owned(),
                font_family: "sans-serif".to_owned(),
                base_font_size: 160,
                base_line_height: 170,
                bold: true,
            },
            TextBlock {
                kind: BlockKind::Agenda,
                content: "09:00 Apertura\n10:00 Immersione\n12:00 Pranzo".to_owned(),
                font_family: "monospace".to_owned(),
                base_font_size: 20,
                base_line_height: 40,
                bold: false,
            },
        ];
        let fit = Solver::new(&METRICS, &params).solve(&blocks, 1920.0, 1080.0);
        assert_eq!(1.0, fit.scale);
        let agenda = fit.agenda.as_ref().unwrap();
        assert_eq!(20.0, agenda.font.size_px);
        assert_eq!(40.0, agenda.line_height);
        assert_eq!(120.0, agenda.height);
    }

    #[test]
    fn default_agenda_block_keeps_one_and_a_half_line_height() {
        let fit = solve(&full_content(14), &LayoutParams::default());
        let agenda = fit.agenda.as_ref().unwrap();
        assert_eq!((agenda.font.size_px * 1.5).round(), agenda.line_height);
    }

    #[test]
    fn scale_never_reaches_zero() {
        let params = LayoutParams {
            search: SearchParams { step: 0.25, max_iterations: 50, min_scale: 0.1 },
            ..Default::default()
        };
        let solver = Solver::new(&METRICS, &params);
        let content = PosterContent { title: "word ".repeat(400), ..Default::default() };
        let fit = solver.solve(&content.blocks(&params), 1920.0, 1080.0);
        assert!(fit.scale > 0.0 && fit.scale <= 1.0);
        assert_eq!(0.25, fit.scale);
        assert_eq!(0.25, solver.scale_at(3));
    }
}
