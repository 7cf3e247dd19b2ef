//! Inline SVG charts for the sentiment counts.

use super::summary::{Palette, SentimentCounts};
use std::f64::consts::{PI, TAU};
use std::fmt::Write;

const WIDTH: f64 = 360.0;
const HEIGHT: f64 = 280.0;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn open_svg(title: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}" width="{WIDTH}" height="{HEIGHT}" role="img" aria-label="{title}"><title>{title}</title>"#,
        title = escape(title)
    )
}

/// One bar per label, heights proportional to the count.
pub fn bar_chart_svg(counts: &SentimentCounts, palette: &Palette) -> String {
    let mut svg = open_svg("Sentiment Distribution");
    let max = counts.entries().iter().map(|(_, c)| *c).max().unwrap_or(0);
    if max == 0 {
        svg.push_str("</svg>");
        return svg;
    }

    let (left, right, top, bottom) = (40.0, 10.0, 20.0, 40.0);
    let plot_w = WIDTH - left - right;
    let plot_h = HEIGHT - top - bottom;
    let slot = plot_w / counts.len() as f64;
    let bar_w = slot * 0.6;
    let baseline = top + plot_h;

    let _ = write!(
        svg,
        r##"<line x1="{left}" y1="{baseline}" x2="{x2}" y2="{baseline}" stroke="#555"/>"##,
        x2 = WIDTH - right
    );

    for (i, (label, count)) in counts.entries().iter().enumerate() {
        let h = plot_h * *count as f64 / max as f64;
        let x = left + slot * i as f64 + (slot - bar_w) / 2.0;
        let y = baseline - h;
        let center = x + bar_w / 2.0;
        let _ = write!(
            svg,
            r#"<rect x="{x:.2}" y="{y:.2}" width="{bar_w:.2}" height="{h:.2}" fill="{fill}"><title>{label}: {count}</title></rect>"#,
            fill = palette.color(label),
            label = escape(label),
        );
        let _ = write!(
            svg,
            r#"<text x="{center:.2}" y="{ty:.2}" text-anchor="middle" font-size="12">{count}</text>"#,
            ty = y - 4.0,
        );
        let _ = write!(
            svg,
            r#"<text x="{center:.2}" y="{ly:.2}" text-anchor="middle" font-size="12">{label}</text>"#,
            ly = baseline + 18.0,
            label = escape(label),
        );
    }
    svg.push_str("</svg>");
    svg
}

/// One slice per label labelled with its share (`{:.1}%`).
pub fn pie_chart_svg(counts: &SentimentCounts, palette: &Palette) -> String {
    let mut svg = open_svg("Sentiment Breakdown");
    let (cx, cy, r) = (WIDTH / 2.0, HEIGHT / 2.0 + 10.0, 100.0);
    let _ = write!(
        svg,
        r#"<text x="{cx}" y="18" text-anchor="middle" font-size="14" font-weight="bold">Sentiment Breakdown</text>"#
    );

    let total = counts.total();
    if total == 0 {
        svg.push_str("</svg>");
        return svg;
    }

    // Slices run counter-clockwise from 3 o'clock.
    let mut start = 0.0_f64;
    for (label, count) in counts.entries() {
        let share = *count as f64 / total as f64;
        let sweep = share * TAU;
        let fill = palette.color(label);
        let pct = counts.percentage(*count);

        if *count == total {
            let _ = write!(
                svg,
                r#"<circle cx="{cx}" cy="{cy}" r="{r}" fill="{fill}"><title>{label}: {pct:.1}%</title></circle>"#,
                label = escape(label),
            );
        } else {
            let end = start + sweep;
            let (x1, y1) = (cx + r * start.cos(), cy - r * start.sin());
            let (x2, y2) = (cx + r * end.cos(), cy - r * end.sin());
            let large = u8::from(sweep > PI);
            let _ = write!(
                svg,
                r#"<path d="M {cx} {cy} L {x1:.2} {y1:.2} A {r} {r} 0 {large} 0 {x2:.2} {y2:.2} Z" fill="{fill}" stroke="white"><title>{label}: {pct:.1}%</title></path>"#,
                label = escape(label),
            );
        }

        let mid = start + sweep / 2.0;
        let (lx, ly) = (cx + r * 0.6 * mid.cos(), cy - r * 0.6 * mid.sin());
        let (ox, oy) = (cx + r * 1.18 * mid.cos(), cy - r * 1.18 * mid.sin());
        let anchor = if mid.cos().abs() < 0.2 {
            "middle"
        } else if mid.cos() > 0.0 {
            "start"
        } else {
            "end"
        };
        let _ = write!(
            svg,
            r#"<text x="{lx:.2}" y="{ly:.2}" text-anchor="middle" font-size="12">{pct:.1}%</text>"#
        );
        let _ = write!(
            svg,
            r#"<text x="{ox:.2}" y="{oy:.2}" text-anchor="{anchor}" font-size="12">{label}</text>"#,
            label = escape(label),
        );
        start += sweep;
    }
    svg.push_str("</svg>");
    svg
}
