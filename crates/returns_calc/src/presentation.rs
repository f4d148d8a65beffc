use crate::returns::{InvestmentSeries, Summary};
use chrono::NaiveDate;
use serde::Serialize;

pub const CHART_TITLE: &str = "Investment Value Over Time";
pub const X_AXIS_LABEL: &str = "Date";
pub const Y_AXIS_LABEL: &str = "Investment Value";
const Y_HEADROOM: f64 = 1.1;

/// Axis layout of the investment chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFrame {
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub x_range: (NaiveDate, NaiveDate),
    pub y_range: (f64, f64),
}

impl ChartFrame {
    pub fn for_series(series: &InvestmentSeries) -> Self {
        ChartFrame {
            title: CHART_TITLE,
            x_label: X_AXIS_LABEL,
            y_label: Y_AXIS_LABEL,
            x_range: (series.first().date, series.last().date),
            y_range: (0.0, series.max_value() * Y_HEADROOM),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusLines {
    pub initial: String,
    pub final_value: String,
    pub total_return: String,
}

impl StatusLines {
    pub fn from_summary(summary: &Summary) -> Self {
        StatusLines {
            initial: format!("Initial Investment Value: {:.2}", summary.initial),
            final_value: format!("Final Investment Value: {:.2}", summary.final_value),
            total_return: format!(
                "Total return on investment is: {:.2} %",
                summary.return_pct
            ),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.initial.as_str(),
            self.final_value.as_str(),
            self.total_return.as_str(),
        ]
        .into_iter()
    }
}
