use miette::{IntoDiagnostic, Result};

use crate::agenda::{AgendaLayout, ColumnMode};
use crate::background::Background;
use crate::canvas::{Canvas, CoverFit};
use crate::fit::{BlockFit, FitResult, Placed, Solver};
use crate::layout::{BlockKind, LayoutParams, TextBlock};
use crate::metrics::{FontSpec, PangoText, Shadow, TextMetrics, TextPaint};
use crate::output::OutputFormat;
use crate::theme::Palette;
use crate::wrap::{wrap_into, LineSink};

const TITLE_SHADOW_BLUR: f64 = 10.0;
const BODY_SHADOW_BLUR: f64 = 5.0;

#[derive(Debug, Clone, Copy)]
enum Align {
    Center(f64),
    Left(f64),
}

/// Draws each wrapped line as it comes out of the wrapper.
struct Painter<'a> {
    text: &'a PangoText,
    ctx: &'a cairo::Context,
    font: &'a FontSpec,
    paint: TextPaint,
    align: Align,
}

impl LineSink for Painter<'_> {
    type Error = miette::Report;

    fn line(&mut self, line: &str, top: f64) -> Result<()> {
        let x = match self.align {
            Align::Center(center) => center - self.text.measure_width(line, self.font) / 2.0,
            Align::Left(left) => left,
        };
        self.text.draw_line(self.ctx, line, self.font, (x, top), &self.paint)
    }
}

/// Paints posters onto a caller-owned [`Canvas`].
pub struct Compositor {
    text: PangoText,
    params: LayoutParams,
    palette: Palette,
}

impl Compositor {
    pub fn new(params: LayoutParams, palette: Palette) -> Result<Self> {
        params.validate()?;
        Ok(Compositor { text: PangoText::new()?, params, palette })
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    /// Repaints the whole canvas: background (or the fallback fill), overlay,
    /// then the text blocks at the solved scale. Returns the layout that was
    /// drawn.
    pub fn compose(
        &self,
        canvas: &mut Canvas,
        blocks: &[TextBlock],
        background: Option<&Background>,
    ) -> Result<FitResult> {
        let width = f64::from(canvas.width());
        let height = f64::from(canvas.height());
        let ctx = canvas.context()?;

        ctx.set_operator(cairo::Operator::Clear);
        ctx.paint().into_diagnostic()?;
        ctx.set_operator(cairo::Operator::Over);

        match background {
            Some(bg) => {
                let fit = CoverFit::new((f64::from(bg.width()), f64::from(bg.height())), (width, height));
                ctx.save().into_diagnostic()?;
                ctx.translate(fit.x, fit.y);
                ctx.scale(fit.scale, fit.scale);
                ctx.set_source_surface(bg.surface(), 0.0, 0.0).into_diagnostic()?;
                ctx.source().set_filter(cairo::Filter::Good);
                ctx.paint().into_diagnostic()?;
                ctx.restore().into_diagnostic()?;
            }
            None => {
                self.palette.fallback_background.set_source(&ctx);
                ctx.paint().into_diagnostic()?;
            }
        }

        self.palette.overlay.paint(&ctx, width, height)?;

        for block in blocks {
            let resolved = self.text.resolve_family(&block.font_family);
            if resolved != block.font_family {
                tracing::warn!(block = ?block.kind, requested = %block.font_family, resolved, "font family not installed");
            }
        }

        let fit = Solver::new(&self.text, &self.params).solve(blocks, width, height);
        let group_top = ((height - fit.total_height) / 2.0).max(self.params.min_top_margin);
        tracing::info!(scale = fit.scale, total_height = fit.total_height, group_top, fits = fit.fits, "layout solved");

        for (offset, placed) in fit.stack() {
            let top = group_top + offset;
            match placed {
                Placed::Text(block) => self.draw_text(&ctx, block, width / 2.0, top)?,
                Placed::Agenda(agenda) => self.draw_agenda(&ctx, agenda, width, top)?,
            }
        }

        Ok(fit)
    }

    /// [`compose`](Self::compose) followed by encoding the canvas.
    pub fn render(
        &self,
        canvas: &mut Canvas,
        blocks: &[TextBlock],
        background: Option<&Background>,
        format: OutputFormat,
    ) -> Result<Vec<u8>> {
        self.compose(canvas, blocks, background)?;
        canvas.encode(format)
    }

    fn text_paint(&self, kind: BlockKind) -> TextPaint {
        let shadow = |blur| Some(Shadow { color: self.palette.shadow, blur });
        match kind {
            BlockKind::Title => TextPaint { fill: self.palette.title, shadow: shadow(TITLE_SHADOW_BLUR) },
            BlockKind::Description => TextPaint { fill: self.palette.description, shadow: shadow(BODY_SHADOW_BLUR) },
            BlockKind::Location => TextPaint { fill: self.palette.accent, shadow: shadow(BODY_SHADOW_BLUR) },
            BlockKind::Agenda => TextPaint { fill: self.palette.agenda, shadow: None },
        }
    }

    fn draw_text(&self, ctx: &cairo::Context, block: &BlockFit, center: f64, top: f64) -> Result<()> {
        let mut painter = Painter {
            text: &self.text,
            ctx,
            font: &block.font,
            paint: self.text_paint(block.kind),
            align: Align::Center(center),
        };
        wrap_into(&self.text, &block.text, &block.font, block.max_width, block.line_height, top, &mut painter)?;
        Ok(())
    }

    fn draw_agenda(&self, ctx: &cairo::Context, agenda: &AgendaLayout, canvas_width: f64, top: f64) -> Result<()> {
        let paint = self.text_paint(BlockKind::Agenda);
        for (column, origin) in agenda.columns.iter().zip(agenda.column_origins(canvas_width)) {
            let align = match agenda.mode {
                ColumnMode::Single => Align::Center(origin),
                ColumnMode::Double => Align::Left(origin),
            };
            let mut y = top;
            for item in &column.items {
                let mut painter = Painter { text: &self.text, ctx, font: &agenda.font, paint, align };
                y += wrap_into(&self.text, item, &agenda.font, column.width, agenda.line_height, y, &mut painter)?.height;
            }
        }
        Ok(())
    }
}
