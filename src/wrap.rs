//! Greedy word wrapping shared by the measuring and drawing passes.

use std::convert::Infallible;

use crate::metrics::{FontSpec, TextMetrics};

/// Receives each finished line together with its top edge.
pub trait LineSink {
    type Error;

    fn line(&mut self, text: &str, top: f64) -> Result<(), Self::Error>;
}

/// Sink for the measuring pass; discards lines.
pub struct Measure;

impl LineSink for Measure {
    type Error = Infallible;

    fn line(&mut self, _text: &str, _top: f64) -> Result<(), Infallible> {
        Ok(())
    }
}

impl<F: FnMut(&str, f64)> LineSink for F {
    type Error = Infallible;

    fn line(&mut self, text: &str, top: f64) -> Result<(), Infallible> {
        self(text, top);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paragraph {
    pub line_count: usize,
    pub height: f64,
}

impl Paragraph {
    pub const EMPTY: Paragraph = Paragraph { line_count: 0, height: 0.0 };
}

/// Wraps `text` at `max_width`, handing each line to `sink` starting at
/// `top`. A line's first word is never pushed to the next line, so a single
/// over-wide word gets a line of its own.
pub fn wrap_into<M, S>(
    metrics: &M,
    text: &str,
    font: &FontSpec,
    max_width: f64,
    line_height: f64,
    top: f64,
    sink: &mut S,
) -> Result<Paragraph, S::Error>
where
    M: TextMetrics + ?Sized,
    S: LineSink + ?Sized,
{
    let mut line = String::new();
    let mut line_count = 0;

    for word in text.split_whitespace() {
        if !line.is_empty() {
            let candidate = format!("{line} {word} ");
            if metrics.measure_width(&candidate, font) > max_width {
                sink.line(&line, top + line_count as f64 * line_height)?;
                line_count += 1;
                line.clear();
            } else {
                line.push(' ');
            }
        }
        line.push_str(word);
    }

    if !line.is_empty() {
        sink.line(&line, top + line_count as f64 * line_height)?;
        line_count += 1;
    }

    Ok(Paragraph { line_count, height: line_count as f64 * line_height })
}

/// Measure-only wrap.
pub fn wrap<M>(metrics: &M, text: &str, font: &FontSpec, max_width: f64, line_height: f64) -> Paragraph
where
    M: TextMetrics + ?Sized,
{
    match wrap_into(metrics, text, font, max_width, line_height, 0.0, &mut Measure) {
        Ok(p) => p,
        Err(never) => match never {},
    }
}

/// Splits `text` into the lines `wrap` would produce.
#[cfg(test)]
pub(crate) fn wrapped_lines<M>(metrics: &M, text: &str, font: &FontSpec, max_width: f64) -> Vec<String>
where
    M: TextMetrics + ?Sized,
{
    let mut lines = Vec::new();
    let mut collect = |line: &str, _top: f64| lines.push(line.to_owned());
    match wrap_into(metrics, text, font, max_width, 0.0, 0.0, &mut collect) {
        Ok(_) => lines,
        Err(never) => match never {},
    }
}
