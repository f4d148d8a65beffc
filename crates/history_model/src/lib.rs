use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// One trading day for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SeriesError {
    #[error("bar for {symbol} dated {date} comes after {previous}")]
    OutOfOrder {
        symbol: String,
        date: NaiveDate,
        previous: NaiveDate,
    },
}

/// Daily bars of a single symbol, dates strictly increasing.
///
/// May be empty: a provider answering "no data" yields an empty series, and
/// it is up to the consumer to reject it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Builds a series from bars in provider order.
    ///
    /// Consecutive bars sharing a date collapse into the later one. A bar
    /// dated before its predecessor is an error.
    pub fn from_bars(symbol: &str, bars: Vec<PriceBar>) -> Result<Self, SeriesError> {
        let mut out: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match out.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                Some(last) if last.date > bar.date => {
                    return Err(SeriesError::OutOfOrder {
                        symbol: symbol.to_string(),
                        date: bar.date,
                        previous: last.date,
                    });
                }
                _ => out.push(bar),
            }
        }

        Ok(PriceSeries {
            symbol: symbol.to_string(),
            bars: out,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&PriceBar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }
}

/// What the user asked for, after form defaults were applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestParameters {
    pub symbol: String,
    pub initial_investment: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Anything able to deliver daily bars for a symbol over an inclusive date range.
#[allow(async_fn_in_trait)]
pub trait CandleSource {
    type Error: Error;

    async fn fetch(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> PriceBar {
        PriceBar {
            symbol: "MSFT".to_string(),
            date: NaiveDate::from_ymd_opt(2020, 1, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100,
        }
    }

    #[test]
    fn from_bars_pass_keeps_order() {
        let series = PriceSeries::from_bars("MSFT", vec![bar(2, 1.0), bar(3, 2.0), bar(6, 3.0)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.symbol(), "MSFT");
        assert_eq!(series.first().unwrap().close, 1.0);
        assert_eq!(series.last().unwrap().close, 3.0);
    }

    #[test]
    fn from_bars_pass_collapses_duplicate_dates() {
        let series = PriceSeries::from_bars("MSFT", vec![bar(2, 1.0), bar(2, 1.5), bar(3, 2.0)]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].close, 1.5);
    }

    #[test]
    fn from_bars_pass_empty() {
        let series = PriceSeries::from_bars("MSFT", vec![]).unwrap();
        assert!(series.is_empty());
        assert!(series.first().is_none());
    }

    #[test]
    fn from_bars_fail_out_of_order() {
        let result = PriceSeries::from_bars("MSFT", vec![bar(3, 1.0), bar(2, 2.0)]);
        assert_eq!(
            result,
            Err(SeriesError::OutOfOrder {
                symbol: "MSFT".to_string(),
                date: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
                previous: NaiveDate::from_ymd_opt(2020, 1, 3).unwrap(),
            })
        );
    }

    #[test]
    fn price_bar_serializes_date_as_iso() {
        let json = serde_json::to_value(bar(2, 10.0)).unwrap();
        assert_eq!(json["date"], "2020-01-02");
        assert_eq!(json["volume"], 100);
    }
}
