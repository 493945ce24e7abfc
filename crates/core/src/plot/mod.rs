//! Proportion-of-variance bar charts rendered as SVG strings.

mod svg;

pub use svg::{comparison_chart, decomposition_chart, save_svg, stacked_bars, Bar};
