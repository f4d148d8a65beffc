use chrono::NaiveDate;
use history_model::PriceSeries;
use serde::Serialize;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ReturnsError {
    #[error("no price data for {symbol}")]
    NoData { symbol: String },
    #[error("first close of {symbol} on {date} is {close}, cannot normalize against it")]
    DegenerateReferencePrice {
        symbol: String,
        date: NaiveDate,
        close: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InvestmentPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Value of the initial investment on every trading day of a price series.
///
/// Only [`normalize`] builds one, so it always holds at least one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentSeries {
    symbol: String,
    points: Vec<InvestmentPoint>,
}

impl InvestmentSeries {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[InvestmentPoint] {
        &self.points
    }

    pub fn first(&self) -> InvestmentPoint {
        self.points[0]
    }

    pub fn last(&self) -> InvestmentPoint {
        self.points[self.points.len() - 1]
    }

    pub fn max_value(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.value)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub initial: f64,
    #[serde(rename = "final")]
    pub final_value: f64,
    pub return_pct: f64,
}

/// Rounds half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Scales closes so the first trading day is worth `initial_investment`.
///
/// `value[i] = initial_investment * close[i] / close[0]`, unrounded.
pub fn normalize(
    series: &PriceSeries,
    initial_investment: f64,
) -> Result<InvestmentSeries, ReturnsError> {
    let reference = series.first().ok_or_else(|| ReturnsError::NoData {
        symbol: series.symbol().to_string(),
    })?;

    if !reference.close.is_finite() || reference.close <= 0.0 {
        return Err(ReturnsError::DegenerateReferencePrice {
            symbol: series.symbol().to_string(),
            date: reference.date,
            close: reference.close,
        });
    }

    let points = series
        .bars()
        .iter()
        .map(|bar| InvestmentPoint {
            date: bar.date,
            value: initial_investment * (bar.close / reference.close),
        })
        .collect();

    Ok(InvestmentSeries {
        symbol: series.symbol().to_string(),
        points,
    })
}

pub fn summarize(series: &InvestmentSeries, initial_investment: f64) -> Summary {
    let final_value = series.last().value;
    Summary {
        initial: initial_investment,
        final_value,
        return_pct: round2((final_value - initial_investment) / initial_investment * 100.0),
    }
}
