//! Inline SVG candlestick chart with a volume panel underneath.

use crate::types::Candle;
use std::fmt::Write;

const WIDTH: f64 = 1000.0;
const PRICE_HEIGHT: f64 = 400.0;
const GAP: f64 = 60.0;
const VOLUME_HEIGHT: f64 = 150.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_TOP: f64 = 30.0;
const AXIS_COLOR: &str = "rgb(0, 179, 77)";
const UP_COLOR: &str = "#3d9970";
const DOWN_COLOR: &str = "#ff4136";
const VOLUME_COLOR: &str = "yellow";
const PRICE_TICKS: usize = 5;

/// Renders `candles` as a self-contained `<svg>` element.
pub fn render_candlestick_svg(title: &str, candles: &[Candle]) -> String {
    let total_height = MARGIN_TOP + PRICE_HEIGHT + GAP + VOLUME_HEIGHT + MARGIN_TOP;
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg class="stock-chart" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" style="background:rgba(0,0,0,0)">"#,
        w = WIDTH + MARGIN_LEFT,
        h = total_height,
    );
    let _ = write!(
        svg,
        r#"<text x="{x}" y="18" fill="{c}" font-size="16" text-anchor="middle">{t}</text>"#,
        x = MARGIN_LEFT + WIDTH / 2.0,
        c = AXIS_COLOR,
        t = crate::pages::escape(title),
    );

    if candles.is_empty() {
        let _ = write!(
            svg,
            r#"<text x="{x}" y="{y}" fill="{c}" text-anchor="middle">No price history available</text></svg>"#,
            x = MARGIN_LEFT + WIDTH / 2.0,
            y = MARGIN_TOP + PRICE_HEIGHT / 2.0,
            c = AXIS_COLOR,
        );
        return svg;
    }

    let low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let high = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let span = if high > low { high - low } else { 1.0 };
    let max_volume = candles.iter().map(|c| c.volume).max().unwrap_or(0).max(1) as f64;

    let slot = WIDTH / candles.len() as f64;
    let body_width = (slot * 0.7).max(0.5);
    let price_y = |p: f64| MARGIN_TOP + (high - p) / span * PRICE_HEIGHT;
    let volume_top = MARGIN_TOP + PRICE_HEIGHT + GAP;

    // Axes and price gridlines
    let _ = write!(
        svg,
        r#"<g stroke="{c}" stroke-width="1"><line x1="{l}" y1="{t}" x2="{l}" y2="{b}"/><line x1="{l}" y1="{vb}" x2="{r}" y2="{vb}"/></g>"#,
        c = AXIS_COLOR,
        l = MARGIN_LEFT,
        t = MARGIN_TOP,
        b = MARGIN_TOP + PRICE_HEIGHT,
        vb = volume_top + VOLUME_HEIGHT,
        r = MARGIN_LEFT + WIDTH,
    );
    for i in 0..=PRICE_TICKS {
        let price = low + span * i as f64 / PRICE_TICKS as f64;
        let _ = write!(
            svg,
            r#"<text x="{x}" y="{y:.1}" fill="{c}" font-size="11" text-anchor="end">{p:.2}</text>"#,
            x = MARGIN_LEFT - 6.0,
            y = price_y(price) + 4.0,
            c = AXIS_COLOR,
            p = price,
        );
    }
    let _ = write!(
        svg,
        r#"<text x="{x}" y="{y}" fill="{c}" font-size="14" text-anchor="middle">Volume</text>"#,
        x = MARGIN_LEFT + WIDTH / 2.0,
        y = volume_top - 10.0,
        c = AXIS_COLOR,
    );

    svg.push_str(r#"<g class="candles">"#);
    for (i, candle) in candles.iter().enumerate() {
        let center = MARGIN_LEFT + slot * (i as f64 + 0.5);
        let color = if candle.is_bullish() { UP_COLOR } else { DOWN_COLOR };
        let top = price_y(candle.open.max(candle.close));
        let bottom = price_y(candle.open.min(candle.close));
        let _ = write!(
            svg,
            r#"<line x1="{cx:.2}" y1="{hy:.2}" x2="{cx:.2}" y2="{ly:.2}" stroke="{col}"/><rect x="{bx:.2}" y="{top:.2}" width="{bw:.2}" height="{bh:.2}" fill="{col}"><title>{d} O:{o:.2} H:{h:.2} L:{l:.2} C:{c:.2}</title></rect>"#,
            cx = center,
            hy = price_y(candle.high),
            ly = price_y(candle.low),
            col = color,
            bx = center - body_width / 2.0,
            top = top,
            bw = body_width,
            bh = (bottom - top).max(0.5),
            d = candle.date,
            o = candle.open,
            h = candle.high,
            l = candle.low,
            c = candle.close,
        );
    }
    svg.push_str("</g>");

    svg.push_str(r#"<g class="volume">"#);
    for (i, candle) in candles.iter().enumerate() {
        let height = candle.volume as f64 / max_volume * VOLUME_HEIGHT;
        let _ = write!(
            svg,
            r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="{c}"/>"#,
            x = MARGIN_LEFT + slot * i as f64 + (slot - body_width) / 2.0,
            y = volume_top + VOLUME_HEIGHT - height,
            w = body_width,
            h = height,
            c = VOLUME_COLOR,
        );
    }
    svg.push_str("</g></svg>");
    svg
}
