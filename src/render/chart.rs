//! Chart tiers drawn as SVG and embedded as `data:` URIs

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::text::PRICE_UNAVAILABLE;
use super::{pct, progress_bar, sign_glyph, signed, signed_sol, signed_usd, sol, usd, RenderStrategy, RenderTier};
use crate::error::{RenderError, RenderResult};
use crate::types::{AlertEvent, PositionView, Severity, Snapshot, StuckPosition, TrendPoint};

const BACKGROUND: &str = "#0C0E10";
const WHITE: &str = "#ffffff";
const MUTED: &str = "#9aa0a6";
const GRAY: &str = "#808080";
const LIME: &str = "#00ff00";
const CYAN: &str = "#00ffff";
const RED: &str = "#ff3b3b";
const YELLOW: &str = "#ffd400";

const DATA_URI_PREFIX: &str = "data:image/svg+xml;base64,";

/// Positions drawn in the performance panel
const MAX_CHART_POSITIONS: usize = 10;
/// Stuck positions drawn in the attention panel
const MAX_CHART_STUCK: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(&self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// Minimal SVG builder
///
/// Any non-finite coordinate poisons the canvas and `finish` reports it
/// instead of emitting a broken document.
pub struct SvgChart {
    width: f64,
    height: f64,
    body: String,
    invalid: Option<String>,
}

impl SvgChart {
    pub fn new(width: f64, height: f64) -> Self {
        let mut canvas = Self {
            width,
            height,
            body: String::new(),
            invalid: None,
        };
        canvas.rect(0.0, 0.0, width, height, BACKGROUND, 1.0);
        canvas
    }

    fn check(&mut self, what: &str, values: &[f64]) -> bool {
        if self.invalid.is_some() {
            return false;
        }
        if values.iter().all(|v| v.is_finite()) {
            true
        } else {
            self.invalid = Some(format!("{} coordinates {:?}", what, values));
            false
        }
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str, opacity: f64) {
        if !self.check("rect", &[x, y, w, h, opacity]) {
            return;
        }
        // Negative extents are drawn from the other edge
        let (x, w) = if w < 0.0 { (x + w, -w) } else { (x, w) };
        let (y, h) = if h < 0.0 { (y + h, -h) } else { (y, h) };
        self.body.push_str(&format!(
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" fill-opacity="{:.2}"/>"#,
            x, y, w, h, fill, opacity
        ));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str, width: f64, dashed: bool) {
        if !self.check("line", &[x1, y1, x2, y2, width]) {
            return;
        }
        let dash = if dashed { r#" stroke-dasharray="6 4" stroke-opacity="0.4""# } else { "" };
        self.body.push_str(&format!(
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="{:.1}"{}/>"#,
            x1, y1, x2, y2, stroke, width, dash
        ));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn text(&mut self, x: f64, y: f64, size: u32, fill: &str, anchor: Anchor, bold: bool, content: &str) {
        if !self.check("text", &[x, y]) {
            return;
        }
        let weight = if bold { "bold" } else { "normal" };
        self.body.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="{}" font-weight="{}" fill="{}" text-anchor="{}">{}</text>"#,
            x,
            y,
            size,
            weight,
            fill,
            anchor.as_str(),
            escape(content)
        ));
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], stroke: &str, width: f64) {
        let flat: Vec<f64> = points.iter().flat_map(|(x, y)| [*x, *y]).collect();
        if !self.check("polyline", &flat) {
            return;
        }
        let coords: Vec<String> = points.iter().map(|(x, y)| format!("{:.1},{:.1}", x, y)).collect();
        self.body.push_str(&format!(
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{:.1}"/>"#,
            coords.join(" "),
            stroke,
            width
        ));
    }

    pub fn finish(self) -> RenderResult<String> {
        if let Some(reason) = self.invalid {
            return Err(RenderError::NonFinite(reason));
        }
        if !self.width.is_finite() || !self.height.is_finite() {
            return Err(RenderError::NonFinite("canvas size".to_string()));
        }
        Ok(format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">{body}</svg>"#,
            w = self.width,
            h = self.height,
            body = self.body
        ))
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decimal to chart coordinate space
pub fn to_f64(value: Decimal, what: &str) -> RenderResult<f64> {
    value
        .to_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RenderError::NonFinite(format!("{} = {}", what, value)))
}

/// Base64 `data:` URI for an SVG document, bounded by the sink's image limit
pub fn encode_data_uri(svg: &str, limit: usize) -> RenderResult<String> {
    if svg.trim().is_empty() {
        return Err(RenderError::Empty);
    }
    let uri = format!("{}{}", DATA_URI_PREFIX, STANDARD.encode(svg.as_bytes()));
    if uri.len() > limit {
        return Err(RenderError::ImageTooLarge {
            size: uri.len(),
            limit,
        });
    }
    Ok(uri)
}

fn pnl_color(value: Decimal) -> &'static str {
    if value < Decimal::ZERO {
        RED
    } else if value > Decimal::ZERO {
        LIME
    } else {
        WHITE
    }
}

fn caption(snapshot: &Snapshot) -> String {
    format!(
        "{} **{}** ({}) · Balance {}\nProgress {} of {} daily target",
        sign_glyph(snapshot.session_pnl_sol),
        signed_sol(snapshot.session_pnl_sol),
        signed_usd(snapshot.session_pnl_usd),
        sol(snapshot.balance_sol),
        pct(snapshot.progress_pct),
        usd(snapshot.daily_target_usd),
    )
}

fn header_panel(canvas: &mut SvgChart, snapshot: &Snapshot, top: f64, title: &str) {
    let width = canvas.width;
    canvas.text(30.0, top + 45.0, 28, WHITE, Anchor::Start, true, title);
    canvas.text(
        width - 30.0,
        top + 45.0,
        14,
        MUTED,
        Anchor::End,
        false,
        &snapshot.captured_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    );

    let column = (width - 60.0) / 3.0;
    let stats = [
        ("Balance", sol(snapshot.balance_sol), WHITE),
        (
            "Session P&L",
            format!(
                "{} ({})",
                signed_sol(snapshot.session_pnl_sol),
                signed_usd(snapshot.session_pnl_usd)
            ),
            pnl_color(snapshot.session_pnl_sol),
        ),
        (
            "Win Rate",
            format!(
                "{} ({}/{})",
                pct(snapshot.win_rate_pct),
                snapshot.win_count,
                snapshot.trade_count
            ),
            WHITE,
        ),
    ];
    for (i, (label, value, color)) in stats.iter().enumerate() {
        let x = 30.0 + column * i as f64;
        canvas.text(x, top + 80.0, 13, MUTED, Anchor::Start, false, label);
        canvas.text(x, top + 105.0, 18, color, Anchor::Start, true, value);
    }
}

fn progress_panel(canvas: &mut SvgChart, snapshot: &Snapshot, top: f64) -> RenderResult<()> {
    let progress = to_f64(snapshot.progress_pct, "progress_pct")?.clamp(0.0, 100.0);
    let left = 50.0;
    let span = canvas.width - 100.0;
    let bar_top = top + 55.0;
    let bar_height = 44.0;

    canvas.text(
        canvas.width / 2.0,
        top + 22.0,
        18,
        WHITE,
        Anchor::Middle,
        true,
        &format!("Progress to Daily Goal: {}", usd(snapshot.daily_target_usd)),
    );
    canvas.text(
        canvas.width / 2.0,
        top + 44.0,
        14,
        MUTED,
        Anchor::Middle,
        false,
        &format!("Current P&L: {}", signed_usd(snapshot.session_pnl_usd)),
    );

    let fill = if progress >= 100.0 { LIME } else { CYAN };
    canvas.rect(left, bar_top, span, bar_height, GRAY, 0.3);
    canvas.rect(left, bar_top, span * progress / 100.0, bar_height, fill, 0.8);

    for milestone in [25.0, 50.0, 75.0, 100.0] {
        let x = left + span * milestone / 100.0;
        canvas.line(x, bar_top - 4.0, x, bar_top + bar_height + 4.0, WHITE, 1.0, true);
        canvas.text(
            x,
            bar_top + bar_height + 20.0,
            12,
            MUTED,
            Anchor::Middle,
            false,
            &format!("{:.0}%", milestone),
        );
    }

    canvas.text(
        left + 10.0,
        bar_top + 30.0,
        18,
        WHITE,
        Anchor::Start,
        true,
        &pct(snapshot.progress_pct),
    );
    Ok(())
}

fn positions_panel(canvas: &mut SvgChart, positions: &[PositionView], top: f64, height: f64) -> RenderResult<()> {
    let width = canvas.width;
    canvas.text(30.0, top + 25.0, 18, WHITE, Anchor::Start, true, "Current Positions Performance");

    if positions.is_empty() {
        canvas.text(width / 2.0, top + height / 2.0, 22, GRAY, Anchor::Middle, true, "No Active Positions");
        return Ok(());
    }

    let mut priced: Vec<&PositionView> = positions.iter().filter(|p| p.pnl_available()).collect();
    priced.sort_by(|a, b| {
        let pa = a.pnl.map(|p| p.percent).unwrap_or_default();
        let pb = b.pnl.map(|p| p.percent).unwrap_or_default();
        pb.cmp(&pa)
    });
    // Unpriced rows follow the priced ones, labelled instead of barred
    let rows: Vec<&PositionView> = priced
        .into_iter()
        .chain(positions.iter().filter(|p| !p.pnl_available()))
        .take(MAX_CHART_POSITIONS)
        .collect();
    let hidden = positions.len() - rows.len();

    let mut percents = Vec::with_capacity(rows.len());
    for position in &rows {
        let percent = match position.pnl {
            Some(pnl) => Some(to_f64(pnl.percent, "position pnl percent")?),
            None => None,
        };
        percents.push(percent);
    }
    let max_abs = percents.iter().flatten().fold(0.0_f64, |acc, v| acc.max(v.abs())) * 1.3;
    let max_abs = if max_abs > 0.0 { max_abs } else { 1.0 };

    let plot_left = 200.0;
    let plot_right = width - 50.0;
    let zero_x = (plot_left + plot_right) / 2.0;
    let half = (plot_right - plot_left) / 2.0;
    let rows_top = top + 45.0;
    let row_height = ((height - 80.0) / rows.len() as f64).min(30.0);

    canvas.line(zero_x, rows_top, zero_x, rows_top + row_height * rows.len() as f64, WHITE, 2.0, false);

    for (i, (position, percent)) in rows.iter().zip(&percents).enumerate() {
        let y = rows_top + row_height * i as f64;
        canvas.text(plot_left - 10.0, y + row_height * 0.65, 13, WHITE, Anchor::End, false, &position.display_token);

        let (pnl, percent) = match (position.pnl, percent) {
            (Some(pnl), Some(percent)) => (pnl, *percent),
            _ => {
                canvas.text(zero_x + 6.0, y + row_height * 0.65, 12, MUTED, Anchor::Start, false, PRICE_UNAVAILABLE);
                continue;
            }
        };

        let bar = percent / max_abs * half;
        let color = if pnl.percent > Decimal::ZERO { LIME } else { RED };
        canvas.rect(zero_x, y + 3.0, bar, row_height - 6.0, color, 0.8);

        let (label_x, anchor) = if bar >= 0.0 {
            (zero_x + bar + 6.0, Anchor::Start)
        } else {
            (zero_x + bar - 6.0, Anchor::End)
        };
        canvas.text(
            label_x,
            y + row_height * 0.65,
            12,
            WHITE,
            anchor,
            true,
            &format!("{}% ({})", signed(pnl.percent, 1), signed_sol(pnl.amount_sol)),
        );
    }

    if hidden > 0 {
        canvas.text(
            30.0,
            top + height - 12.0,
            12,
            MUTED,
            Anchor::Start,
            false,
            &format!("+{} more positions", hidden),
        );
    }
    Ok(())
}

/// Text list of positions without a price, for the chart event
fn unpriced_field(positions: &[PositionView]) -> Option<String> {
    let unpriced: Vec<&PositionView> = positions.iter().filter(|p| !p.pnl_available()).collect();
    if unpriced.is_empty() {
        return None;
    }
    let mut lines: Vec<String> = unpriced
        .iter()
        .take(MAX_CHART_POSITIONS)
        .map(|p| format!("❔ **{}** · {}", p.display_token, PRICE_UNAVAILABLE))
        .collect();
    if unpriced.len() > MAX_CHART_POSITIONS {
        lines.push(format!("... +{} more", unpriced.len() - MAX_CHART_POSITIONS));
    }
    Some(lines.join("\n"))
}

fn trend_panel(canvas: &mut SvgChart, trend: &[TrendPoint], top: f64, height: f64) -> RenderResult<()> {
    let width = canvas.width;
    canvas.text(30.0, top + 25.0, 18, WHITE, Anchor::Start, true, "Session P&L Trend");

    let (first, last) = match (trend.first(), trend.last()) {
        (Some(first), Some(last)) if trend.len() >= 2 => (first, last),
        _ => {
            canvas.text(width / 2.0, top + height / 2.0, 16, GRAY, Anchor::Middle, false, "Collecting data...");
            return Ok(());
        }
    };

    let mut values = Vec::with_capacity(trend.len());
    for point in trend {
        values.push(to_f64(point.pnl_sol, "trend pnl")?);
    }
    let low = values.iter().fold(0.0_f64, |acc, v| acc.min(*v));
    let high = values.iter().fold(0.0_f64, |acc, v| acc.max(*v));
    let range = if high - low > 0.0 { high - low } else { 1.0 };
    let span_secs = (last.at - first.at).num_seconds().max(1) as f64;

    let left = 80.0;
    let right = width - 50.0;
    let plot_top = top + 45.0;
    let plot_bottom = top + height - 30.0;
    let y_of = |v: f64| plot_bottom - (v - low) / range * (plot_bottom - plot_top);

    canvas.line(left, y_of(0.0), right, y_of(0.0), WHITE, 1.0, true);
    canvas.text(left - 8.0, y_of(high) + 4.0, 11, MUTED, Anchor::End, false, &format!("{:+.3}", high));
    canvas.text(left - 8.0, y_of(low) + 4.0, 11, MUTED, Anchor::End, false, &format!("{:+.3}", low));

    let points: Vec<(f64, f64)> = trend
        .iter()
        .zip(&values)
        .map(|(point, value)| {
            let offset = (point.at - first.at).num_seconds() as f64 / span_secs;
            (left + offset * (right - left), y_of(*value))
        })
        .collect();
    canvas.polyline(&points, pnl_color(last.pnl_sol), 2.5);

    canvas.text(left, plot_bottom + 20.0, 11, MUTED, Anchor::Start, false, &first.at.format("%H:%M").to_string());
    canvas.text(right, plot_bottom + 20.0, 11, MUTED, Anchor::End, false, &last.at.format("%H:%M").to_string());
    canvas.text(
        right,
        plot_top - 8.0,
        13,
        pnl_color(last.pnl_sol),
        Anchor::End,
        true,
        &signed_sol(last.pnl_sol),
    );
    Ok(())
}

fn stuck_panel(canvas: &mut SvgChart, stuck: &[StuckPosition], top: f64, height: f64) {
    let width = canvas.width;
    canvas.text(30.0, top + 25.0, 18, WHITE, Anchor::Start, true, "Positions Requiring Attention");

    if stuck.is_empty() {
        canvas.text(width / 2.0, top + height / 2.0 + 10.0, 18, LIME, Anchor::Middle, true, "No Stuck Positions! 🎉");
        return;
    }

    let mut shown: Vec<&StuckPosition> = stuck.iter().collect();
    shown.sort_by(|a, b| b.failures.cmp(&a.failures));
    shown.truncate(MAX_CHART_STUCK);

    let most = shown.iter().map(|s| s.failures).max().unwrap_or(1).max(1) as f64;
    let plot_left = 200.0;
    let span = width - plot_left - 250.0;
    let row_height = ((height - 45.0) / shown.len() as f64).min(28.0);

    for (i, entry) in shown.iter().enumerate() {
        let y = top + 40.0 + row_height * i as f64;
        let bar = span * entry.failures as f64 / most;
        canvas.text(plot_left - 10.0, y + row_height * 0.65, 13, WHITE, Anchor::End, false, &entry.display_token);
        canvas.rect(plot_left, y + 3.0, bar, row_height - 6.0, if entry.failures > 1 { RED } else { YELLOW }, 0.8);
        canvas.text(
            plot_left + bar + 8.0,
            y + row_height * 0.65,
            12,
            WHITE,
            Anchor::Start,
            false,
            &format!("{} failed closes · size {}", entry.failures, entry.size.normalize()),
        );
    }
}

/// Multi-panel chart: header, progress, positions, trend, stuck positions
#[derive(Debug, Clone, Copy)]
pub struct RichChart {
    max_image_bytes: usize,
}

impl RichChart {
    pub fn new(max_image_bytes: usize) -> Self {
        Self { max_image_bytes }
    }

    pub fn draw(&self, snapshot: &Snapshot) -> RenderResult<String> {
        let mut canvas = SvgChart::new(1000.0, 1180.0);
        header_panel(&mut canvas, snapshot, 0.0, "Session Dashboard");
        progress_panel(&mut canvas, snapshot, 140.0)?;
        positions_panel(&mut canvas, &snapshot.positions, 300.0, 380.0)?;
        trend_panel(&mut canvas, &snapshot.trend, 690.0, 280.0)?;
        stuck_panel(&mut canvas, &snapshot.stuck, 980.0, 190.0);
        canvas.finish()
    }
}

impl RenderStrategy for RichChart {
    fn tier(&self) -> RenderTier {
        RenderTier::RichChart
    }

    fn render(&self, snapshot: &Snapshot) -> RenderResult<AlertEvent> {
        let uri = encode_data_uri(&self.draw(snapshot)?, self.max_image_bytes)?;

        let mut event = AlertEvent::new(
            "📊 Session Dashboard",
            caption(snapshot),
            Severity::for_pnl(snapshot.session_pnl_sol),
            snapshot.captured_at,
        )
        .with_field("💼 Open Positions", snapshot.positions.len().to_string(), true)
        .with_field(
            "📊 Unrealized P&L",
            signed_sol(snapshot.unrealized_pnl_sol),
            true,
        )
        .with_field("🚨 Stuck", snapshot.stuck.len().to_string(), true);

        if let Some(unpriced) = unpriced_field(&snapshot.positions) {
            event = event.with_field("❔ Without Price", unpriced, false);
        }
        Ok(event.with_image(uri))
    }
}

/// Single panel chart: key numbers and the progress bar
#[derive(Debug, Clone, Copy)]
pub struct CompactChart {
    max_image_bytes: usize,
}

impl CompactChart {
    pub fn new(max_image_bytes: usize) -> Self {
        Self { max_image_bytes }
    }

    pub fn draw(&self, snapshot: &Snapshot) -> RenderResult<String> {
        let mut canvas = SvgChart::new(800.0, 300.0);
        header_panel(&mut canvas, snapshot, 0.0, "Session Update");
        progress_panel(&mut canvas, snapshot, 135.0)?;
        canvas.finish()
    }
}

impl RenderStrategy for CompactChart {
    fn tier(&self) -> RenderTier {
        RenderTier::CompactChart
    }

    fn render(&self, snapshot: &Snapshot) -> RenderResult<AlertEvent> {
        let uri = encode_data_uri(&self.draw(snapshot)?, self.max_image_bytes)?;

        Ok(AlertEvent::new(
            "📊 Session Update",
            format!(
                "{}\n`{}`",
                caption(snapshot),
                progress_bar(snapshot.progress_pct)
            ),
            Severity::for_pnl(snapshot.session_pnl_sol),
            snapshot.captured_at,
        )
        .with_image(uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PositionPnl;
    use chrono::{DateTime, Duration, Utc};

    fn ts() -> DateTime<Utc> {
        "2024-06-30T12:00:00Z".parse().unwrap()
    }

    fn snapshot() -> Snapshot {
        let priced = PositionView {
            token_id: "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R".to_string(),
            display_token: "4k3Dy...kX6R".to_string(),
            strategy: "MOMENTUM".to_string(),
            size: Decimal::from(1000),
            entry_price: Decimal::new(1, 4),
            current_price: Some(Decimal::new(15, 5)),
            pnl: Some(PositionPnl {
                percent: Decimal::from(50),
                amount_sol: Decimal::new(5, 2),
            }),
            hold_minutes: 5,
        };
        let unpriced = PositionView {
            token_id: "7bGh2xxxxxxxxxxxxxxxxxxxxxxxxkL9w".to_string(),
            display_token: "7bGh2...kL9w".to_string(),
            strategy: "DIP_BUY".to_string(),
            size: Decimal::from(10),
            entry_price: Decimal::ONE,
            current_price: None,
            pnl: None,
            hold_minutes: 40,
        };

        Snapshot {
            captured_at: ts(),
            session_started_at: None,
            balance_sol: Decimal::TWO,
            session_pnl_sol: Decimal::new(5, 2),
            session_pnl_usd: Decimal::from(12),
            trade_count: 10,
            win_count: 6,
            win_rate_pct: Decimal::from(60),
            best_trade_sol: Decimal::new(3, 2),
            worst_trade_sol: Decimal::new(-1, 2),
            positions: vec![priced, unpriced],
            unrealized_pnl_sol: Decimal::new(5, 2),
            daily_target_usd: Decimal::from(200),
            progress_pct: Decimal::from(6),
            trend: vec![
                TrendPoint {
                    at: ts() - Duration::hours(2),
                    pnl_sol: Decimal::new(-2, 2),
                    pnl_usd: Decimal::new(-48, 1),
                },
                TrendPoint {
                    at: ts(),
                    pnl_sol: Decimal::new(5, 2),
                    pnl_usd: Decimal::from(12),
                },
            ],
            stuck: vec![],
        }
    }

    fn decode(uri: &str) -> String {
        let payload = uri.strip_prefix(DATA_URI_PREFIX).unwrap();
        String::from_utf8(STANDARD.decode(payload).unwrap()).unwrap()
    }

    #[test]
    fn test_rich_chart_embeds_svg() {
        let event = RichChart::new(8 * 1024 * 1024).render(&snapshot()).unwrap();
        let svg = decode(&event.image.as_ref().unwrap().url);

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Session Dashboard"));
        assert!(svg.contains("4k3Dy...kX6R"));
        assert!(svg.contains("+50.0% (+0.0500 SOL)"));
        assert!(svg.contains("7bGh2...kL9w"));
        assert!(svg.contains("price unavailable"));
        assert!(svg.contains("No Stuck Positions!"));
        assert!(!svg.contains("NaN"));
        assert_eq!(event.field("💼 Open Positions").unwrap().value, "2");
        assert_eq!(
            event.field("❔ Without Price").unwrap().value,
            "❔ **7bGh2...kL9w** · price unavailable"
        );
    }

    #[test]
    fn test_all_unpriced_positions_are_labelled() {
        let mut snap = snapshot();
        snap.positions.retain(|p| p.pnl.is_none());
        let svg = RichChart::new(usize::MAX).draw(&snap).unwrap();

        assert!(svg.contains("7bGh2...kL9w"));
        assert!(svg.contains("price unavailable"));
        assert!(!svg.contains("No Active Positions"));
    }

    #[test]
    fn test_priced_only_has_no_unpriced_field() {
        let mut snap = snapshot();
        snap.positions.retain(|p| p.pnl.is_some());
        let event = RichChart::new(usize::MAX).render(&snap).unwrap();
        assert!(event.field("❔ Without Price").is_none());
    }

    #[test]
    fn test_rich_chart_stuck_panel() {
        let mut snap = snapshot();
        snap.stuck.push(StuckPosition {
            position_id: "pos-9".to_string(),
            display_token: "9xQe1...zT3a".to_string(),
            failures: 4,
            size: Decimal::from(250),
            first_failed_at: ts(),
            last_failed_at: ts(),
        });

        let svg = RichChart::new(usize::MAX).draw(&snap).unwrap();
        assert!(svg.contains("9xQe1...zT3a"));
        assert!(svg.contains("4 failed closes"));
        assert!(!svg.contains("No Stuck Positions!"));
    }

    #[test]
    fn test_oversized_image_rejected() {
        let result = RichChart::new(512).render(&snapshot());
        assert!(matches!(
            result,
            Err(RenderError::ImageTooLarge { limit: 512, .. })
        ));
    }

    #[test]
    fn test_compact_smaller_than_rich() {
        let snap = snapshot();
        let rich = RichChart::new(usize::MAX).draw(&snap).unwrap();
        let compact = CompactChart::new(usize::MAX).draw(&snap).unwrap();
        assert!(compact.len() < rich.len());
        assert!(compact.contains("Progress to Daily Goal: $200.00"));
    }

    #[test]
    fn test_single_trend_point_collects() {
        let mut snap = snapshot();
        snap.trend.truncate(1);
        let svg = RichChart::new(usize::MAX).draw(&snap).unwrap();
        assert!(svg.contains("Collecting data..."));
    }

    #[test]
    fn test_non_finite_coordinates_fail() {
        let mut canvas = SvgChart::new(100.0, 100.0);
        canvas.line(0.0, 0.0, f64::NAN, 10.0, WHITE, 1.0, false);
        canvas.text(1.0, 1.0, 10, WHITE, Anchor::Start, false, "after");
        assert!(matches!(canvas.finish(), Err(RenderError::NonFinite(_))));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut canvas = SvgChart::new(10.0, 10.0);
        canvas.text(1.0, 1.0, 10, WHITE, Anchor::Start, false, "P&L <x>");
        let svg = canvas.finish().unwrap();
        assert!(svg.contains("P&amp;L &lt;x&gt;"));
    }
}
