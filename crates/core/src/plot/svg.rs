use std::fmt::Write as _;
use std::path::Path;

use crate::decomposition::{Comparison, Component, Decomposition, LevelTable};
use crate::error::Result;

const PLOT_TOP: f64 = 50.0;
const PLOT_HEIGHT: f64 = 260.0;
const LEFT: f64 = 60.0;
const BAR_WIDTH: f64 = 56.0;
const BAR_GAP: f64 = 34.0;
const LEGEND_WIDTH: f64 = 170.0;

/// One stacked bar: segments are drawn bottom-up in the given order.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub segments: Vec<(Component, f64)>,
}

fn fill(component: Component) -> &'static str {
    match component {
        Component::FixedWithin => "#8b0000",
        Component::FixedBetween => "#4682b4",
        Component::Fixed => "#b22222",
        Component::SlopeVariation => "#191970",
        Component::MeanVariation => "#008b45",
        Component::Residual => "#ffffff",
    }
}

/// Render stacked proportion bars on a fixed [0, 1] axis.
pub fn stacked_bars(title: &str, bars: &[Bar]) -> String {
    let width = LEFT + bars.len() as f64 * (BAR_WIDTH + BAR_GAP) + LEGEND_WIDTH;
    let height = PLOT_TOP + PLOT_HEIGHT + 60.0;
    let bottom = PLOT_TOP + PLOT_HEIGHT;

    let mut s = String::new();
    let _ = writeln!(
        s,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" font-family="sans-serif" font-size="11">"#,
        w = width,
        h = height
    );
    let _ = writeln!(
        s,
        r#"<text x="{:.1}" y="24" font-size="14" text-anchor="middle">{}</text>"#,
        width / 2.0,
        escape(title)
    );

    // Axis with ticks at quarters.
    let _ = writeln!(
        s,
        r##"<line x1="{x:.1}" y1="{t:.1}" x2="{x:.1}" y2="{b:.1}" stroke="#000"/>"##,
        x = LEFT - 8.0,
        t = PLOT_TOP,
        b = bottom
    );
    for i in 0..=4 {
        let frac = i as f64 / 4.0;
        let y = bottom - frac * PLOT_HEIGHT;
        let _ = writeln!(
            s,
            r##"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#000"/><text x="{:.1}" y="{:.1}" text-anchor="end">{:.2}</text>"##,
            LEFT - 12.0,
            LEFT - 8.0,
            LEFT - 14.0,
            y + 4.0,
            frac,
            y = y
        );
    }

    let mut used: Vec<Component> = Vec::new();
    for (i, bar) in bars.iter().enumerate() {
        let x = LEFT + i as f64 * (BAR_WIDTH + BAR_GAP);
        let mut top = bottom;
        for &(component, value) in &bar.segments {
            let h = value.clamp(0.0, 1.0) * PLOT_HEIGHT;
            top -= h;
            let _ = writeln!(
                s,
                r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" stroke="#000" stroke-width="0.5"><title>{}: {:.4}</title></rect>"##,
                x,
                top,
                BAR_WIDTH,
                h,
                fill(component),
                escape(component.name()),
                value
            );
            if !used.contains(&component) {
                used.push(component);
            }
        }
        let _ = writeln!(
            s,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            x + BAR_WIDTH / 2.0,
            bottom + 18.0,
            escape(&bar.label)
        );
    }

    let legend_x = width - LEGEND_WIDTH + 10.0;
    for (i, component) in used.iter().enumerate() {
        let y = PLOT_TOP + i as f64 * 20.0;
        let _ = writeln!(
            s,
            r##"<rect x="{:.1}" y="{:.1}" width="12" height="12" fill="{}" stroke="#000" stroke-width="0.5"/><text x="{:.1}" y="{:.1}">{}</text>"##,
            legend_x,
            y,
            fill(*component),
            legend_x + 18.0,
            y + 10.0,
            escape(component.name())
        );
    }

    s.push_str("</svg>\n");
    s
}

/// One bar per level present in a proportions table.
fn level_bars(prefix: &str, table: &LevelTable<Component>) -> Vec<Bar> {
    table
        .levels()
        .iter()
        .map(|&level| Bar {
            label: format!("{}{}", prefix, level),
            segments: table
                .rows()
                .iter()
                .filter_map(|(component, row)| row.get(level).map(|v| (*component, v)))
                .collect(),
        })
        .collect()
}

/// Total/within/between bars for one model (a single bar without centering).
pub fn decomposition_chart(d: &Decomposition) -> String {
    stacked_bars(
        "Proportion of variance",
        &level_bars("", &d.proportions),
    )
}

/// Model A and B side by side for every level.
pub fn comparison_chart(c: &Comparison) -> String {
    let a = level_bars("Model A ", &c.model_a.proportions);
    let b = level_bars("Model B ", &c.model_b.proportions);
    let bars: Vec<Bar> = a
        .into_iter()
        .zip(b)
        .flat_map(|(a, b)| [a, b])
        .collect();
    stacked_bars("Proportion of variance: Model A vs Model B", &bars)
}

/// Write an SVG string to a file.
pub fn save_svg(svg: &str, path: &Path) -> Result<()> {
    std::fs::write(path, svg)?;
    Ok(())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
