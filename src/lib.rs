//! Renders event posters: a title, description, location and agenda stacked
//! over a cover-fit background, shrunk uniformly until they fit the canvas.

pub mod agenda;
pub mod background;
pub mod canvas;
pub mod color;
pub mod compositor;
pub mod config;
pub mod fit;
pub mod layout;
pub mod metrics;
pub mod output;
pub mod theme;
pub mod wrap;
