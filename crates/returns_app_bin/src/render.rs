use chrono::{Datelike, NaiveDate};
use history_model::RequestParameters;
use returns_calc::{ChartFrame, InvestmentSeries};

use crate::error::AppError;
use crate::pipeline::{INVESTMENT_STEP, ReturnsReport};
use crate::utils::escape_html;

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 450.0;
const PAD_LEFT: f64 = 72.0;
const PAD_RIGHT: f64 = 24.0;
const PAD_TOP: f64 = 20.0;
const PAD_BOTTOM: f64 = 56.0;
const LINE_COLOR: &str = "#348dc1";
const Y_TICKS: usize = 5;

const PAGE_TITLE: &str = "Stock Investment Returns Visualization";

const STYLE: &str = "body{font-family:Arial,sans-serif;max-width:960px;margin:24px auto;color:#222}\
form{display:flex;flex-wrap:wrap;gap:12px;align-items:flex-end;margin-bottom:16px}\
label{display:flex;flex-direction:column;font-size:13px;gap:4px}\
.plot-title{font-size:18px;margin:8px 0}\
.success{background:#e8f5e9;color:#1b5e20;padding:10px 14px;margin:6px 0;border-radius:4px}\
.error{background:#fdecea;color:#b71c1c;padding:10px 14px;margin:6px 0;border-radius:4px}\
.pt{fill:transparent}.pt:hover{fill:#348dc1}";

struct Plane {
    x_range: (NaiveDate, NaiveDate),
    y_max: f64,
}

impl Plane {
    fn new(frame: &ChartFrame) -> Self {
        let y_max = if frame.y_range.1.is_finite() && frame.y_range.1 > frame.y_range.0 {
            frame.y_range.1
        } else {
            1.0
        };
        Plane {
            x_range: frame.x_range,
            y_max,
        }
    }

    fn x(&self, date: NaiveDate) -> f64 {
        let inner = WIDTH - PAD_LEFT - PAD_RIGHT;
        let span = (self.x_range.1 - self.x_range.0).num_days();
        if span <= 0 {
            return PAD_LEFT + inner / 2.0;
        }
        let offset = (date - self.x_range.0).num_days() as f64;
        PAD_LEFT + inner * offset / span as f64
    }

    fn y(&self, value: f64) -> f64 {
        let inner = HEIGHT - PAD_TOP - PAD_BOTTOM;
        PAD_TOP + (1.0 - value / self.y_max) * inner
    }
}

/// Dates labelled on the x-axis: years for long ranges, months for medium ones.
fn date_ticks(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let span = (end - start).num_days();
    if span > 730 {
        (start.year() + 1..=end.year())
            .filter_map(|y| NaiveDate::from_ymd_opt(y, 1, 1))
            .collect()
    } else if span > 62 {
        let mut ticks = Vec::new();
        let mut cursor = start.with_day(1).and_then(|d| d.checked_add_months(chrono::Months::new(1)));
        while let Some(date) = cursor {
            if date > end {
                break;
            }
            ticks.push(date);
            cursor = date.checked_add_months(chrono::Months::new(1));
        }
        ticks
    } else if span > 0 {
        (0..=4)
            .filter_map(|i| start.checked_add_days(chrono::Days::new((span * i / 4) as u64)))
            .collect()
    } else {
        vec![start]
    }
}

fn tick_label(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> String {
    let span = (end - start).num_days();
    if span > 730 {
        date.format("%Y").to_string()
    } else if span > 62 {
        date.format("%Y-%m").to_string()
    } else {
        date.format("%Y-%m-%d").to_string()
    }
}

fn svg_header() -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" role="img"><style>text{{font-family:Arial,sans-serif;font-size:11px;fill:#666}}</style>"#,
        w = WIDTH,
        h = HEIGHT
    )
}

fn add_axes(svg: &mut String, plane: &Plane, frame: &ChartFrame) {
    let bottom = HEIGHT - PAD_BOTTOM;
    let right = WIDTH - PAD_RIGHT;

    for i in 0..=Y_TICKS {
        let value = plane.y_max * i as f64 / Y_TICKS as f64;
        let y = plane.y(value);
        svg.push_str(&format!(
            r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="#dddddd" stroke-width="0.5" />"##,
            x1 = PAD_LEFT,
            x2 = right,
            y = y
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="end">{value:.0}</text>"#,
            x = PAD_LEFT - 6.0,
            y = y + 4.0,
            value = value
        ));
    }

    let (start, end) = plane.x_range;
    for date in date_ticks(start, end) {
        let x = plane.x(date);
        svg.push_str(&format!(
            r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#ccc" stroke-width="1" />"##,
            x = x,
            y1 = bottom,
            y2 = bottom + 4.0
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
            x = x,
            y = bottom + 16.0,
            label = tick_label(date, start, end)
        ));
    }

    svg.push_str(&format!(
        r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="#000" stroke-width="1" />"##,
        x1 = PAD_LEFT,
        x2 = right,
        y = bottom
    ));
    svg.push_str(&format!(
        r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#000" stroke-width="1" />"##,
        x = PAD_LEFT,
        y1 = PAD_TOP,
        y2 = bottom
    ));

    svg.push_str(&format!(
        r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
        x = PAD_LEFT + (right - PAD_LEFT) / 2.0,
        y = HEIGHT - 12.0,
        label = frame.x_label
    ));
    svg.push_str(&format!(
        r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle" transform="rotate(-90 {x:.2} {y:.2})">{label}</text>"#,
        x = 16.0,
        y = PAD_TOP + (bottom - PAD_TOP) / 2.0,
        label = frame.y_label
    ));
}

/// Line chart of the investment value with a hover tooltip on every trading day.
pub fn investment_chart(series: &InvestmentSeries, frame: &ChartFrame) -> String {
    let plane = Plane::new(frame);
    let mut svg = svg_header();

    add_axes(&mut svg, &plane, frame);

    let coords: Vec<(f64, f64)> = series
        .points()
        .iter()
        .filter(|p| p.value.is_finite())
        .map(|p| (plane.x(p.date), plane.y(p.value)))
        .collect();

    let points_attr = coords
        .iter()
        .map(|(x, y)| format!("{x:.2},{y:.2}"))
        .collect::<Vec<_>>()
        .join(" ");
    svg.push_str(&format!(
        r#"<polyline fill="none" stroke="{color}" stroke-width="1.5" points="{points}" />"#,
        color = LINE_COLOR,
        points = points_attr
    ));

    for point in series.points().iter().filter(|p| p.value.is_finite()) {
        svg.push_str(&format!(
            r#"<circle class="pt" cx="{x:.2}" cy="{y:.2}" r="3"><title>{date}: {value:.2}</title></circle>"#,
            x = plane.x(point.date),
            y = plane.y(point.value),
            date = point.date,
            value = point.value
        ));
    }

    svg.push_str("</svg>");
    format!(
        r#"<div class="plot"><div class="plot-title">{title}</div>{svg}</div>"#,
        title = frame.title,
        svg = svg
    )
}

fn form(params: &RequestParameters) -> String {
    format!(
        r#"<form method="get" action="/">
<label>Enter Stock Symbol (e.g., MSFT)<input type="text" name="symbol" value="{symbol}"></label>
<label>Enter Initial Investment in $<input type="number" name="investment" step="{step}" value="{investment:.2}"></label>
<label>Enter Start Date<input type="date" name="start" value="{start}"></label>
<label>Enter End Date<input type="date" name="end" value="{end}"></label>
<button type="submit">Show</button>
</form>"#,
        symbol = escape_html(&params.symbol),
        step = INVESTMENT_STEP,
        investment = params.initial_investment,
        start = params.start_date,
        end = params.end_date
    )
}

pub fn page(params: &RequestParameters, outcome: Result<&ReturnsReport, &AppError>) -> String {
    let body = match outcome {
        Ok(report) => {
            let mut body = investment_chart(&report.series, &report.frame);
            for line in report.status.iter() {
                body.push_str(&format!(r#"<div class="success">{}</div>"#, escape_html(line)));
            }
            body
        }
        Err(err) => format!(
            r#"<div class="error">{}</div>"#,
            escape_html(&err.to_string())
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title><style>{style}</style></head>
<body>
<h1>{title}</h1>
{form}
{body}
</body>
</html>
"#,
        title = PAGE_TITLE,
        style = STYLE,
        form = form(params),
        body = body
    )
}
