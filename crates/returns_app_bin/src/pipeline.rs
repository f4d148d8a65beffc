use chrono::NaiveDate;
use history_model::{CandleSource, RequestParameters};
use log::debug;
use returns_calc::{ChartFrame, InvestmentSeries, StatusLines, Summary, normalize, summarize};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::{fmt, str::FromStr};

use crate::error::AppError;
use crate::utils;

pub const DEFAULT_SYMBOL: &str = "MSFT";
pub const DEFAULT_INVESTMENT: f64 = 1000.0;
pub const MIN_INVESTMENT: f64 = 1.0;
pub const INVESTMENT_STEP: f64 = 10.0;

pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default()
}

/// Raw form fields, all optional so a bare request runs the default scenario.
///
/// A cleared form field arrives as `name=` and counts as missing.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnsQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub investment: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub end: Option<NaiveDate>,
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

impl ReturnsQuery {
    pub fn with_defaults(&self, today: NaiveDate) -> RequestParameters {
        RequestParameters {
            symbol: utils::sanitize_ticker(self.symbol.as_deref().unwrap_or(DEFAULT_SYMBOL)),
            initial_investment: self.investment.unwrap_or(DEFAULT_INVESTMENT),
            start_date: self.start.unwrap_or_else(default_start_date),
            end_date: self.end.unwrap_or(today),
        }
    }
}

/// Rejects what the form itself would not let through.
///
/// The date range is left for the provider to judge.
pub fn validate(params: &RequestParameters) -> Result<(), AppError> {
    if params.symbol.is_empty() {
        return Err(AppError::InvalidInput(
            "symbol must contain letters or digits".to_string(),
        ));
    }
    if !params.initial_investment.is_finite() || params.initial_investment < MIN_INVESTMENT {
        return Err(AppError::InvalidInput(format!(
            "initial investment must be at least {MIN_INVESTMENT:.2}"
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ReturnsReport {
    pub params: RequestParameters,
    pub series: InvestmentSeries,
    pub summary: Summary,
    pub frame: ChartFrame,
    pub status: StatusLines,
}

pub async fn compute_returns<S>(
    source: &S,
    params: RequestParameters,
) -> Result<ReturnsReport, AppError>
where
    S: CandleSource,
    AppError: From<S::Error>,
{
    validate(&params)?;

    let prices = source
        .fetch(&params.symbol, params.start_date, params.end_date)
        .await?;

    debug!(
        "compute_returns | fetched | symbol: {} | bars: {}",
        params.symbol,
        prices.len()
    );

    let series = normalize(&prices, params.initial_investment)
        .map_err(|e| AppError::from_returns(e, params.start_date, params.end_date))?;
    let summary = summarize(&series, params.initial_investment);
    let frame = ChartFrame::for_series(&series);
    let status = StatusLines::from_summary(&summary);

    Ok(ReturnsReport {
        params,
        series,
        summary,
        frame,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use finnhub_api::api::FinnhubError;
    use history_model::{PriceBar, PriceSeries};
    use std::cell::Cell;

    /// Serves fixed closes, one per day from the start date.
    struct StubSource {
        closes: Vec<f64>,
        fail_with: Option<fn() -> FinnhubError>,
        calls: Cell<usize>,
    }

    impl StubSource {
        fn with_closes(closes: &[f64]) -> Self {
            StubSource {
                closes: closes.to_vec(),
                fail_with: None,
                calls: Cell::new(0),
            }
        }
    }

    impl CandleSource for StubSource {
        type Error = FinnhubError;

        async fn fetch(
            &self,
            symbol: &str,
            start_date: NaiveDate,
            _end_date: NaiveDate,
        ) -> Result<PriceSeries, FinnhubError> {
            self.calls.set(self.calls.get() + 1);
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            let bars = self
                .closes
                .iter()
                .enumerate()
                .map(|(i, close)| PriceBar {
                    symbol: symbol.to_string(),
                    date: start_date + chrono::Days::new(i as u64),
                    open: *close,
                    high: *close,
                    low: *close,
                    close: *close,
                    volume: 10,
                })
                .collect();
            Ok(PriceSeries::from_bars(symbol, bars)?)
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn params(investment: f64) -> RequestParameters {
        RequestParameters {
            symbol: "MSFT".to_string(),
            initial_investment: investment,
            start_date: date(2020, 1, 1),
            end_date: date(2020, 1, 31),
        }
    }

    #[test]
    fn with_defaults_pass_empty_query() {
        let today = date(2026, 10, 18);
        let params = ReturnsQuery::default().with_defaults(today);
        assert_eq!(params.symbol, "MSFT");
        assert_eq!(params.initial_investment, 1000.0);
        assert_eq!(params.start_date, date(2015, 1, 1));
        assert_eq!(params.end_date, today);
    }

    #[test]
    fn with_defaults_pass_sanitizes_symbol() {
        let query = ReturnsQuery {
            symbol: Some(" aapl ".to_string()),
            investment: Some(250.0),
            start: Some(date(2019, 5, 1)),
            end: Some(date(2019, 6, 1)),
        };
        let params = query.with_defaults(date(2026, 10, 18));
        assert_eq!(params.symbol, "AAPL");
        assert_eq!(params.initial_investment, 250.0);
        assert_eq!(params.start_date, date(2019, 5, 1));
        assert_eq!(params.end_date, date(2019, 6, 1));
    }

    #[test]
    fn query_pass_cleared_fields_take_defaults() {
        let query =
            actix_web::web::Query::<ReturnsQuery>::from_query("symbol=&investment=&start=&end=")
                .unwrap()
                .into_inner();
        assert!(query.symbol.is_none());
        assert!(query.investment.is_none());
        assert!(query.start.is_none());
        assert!(query.end.is_none());

        let today = date(2026, 10, 18);
        let params = query.with_defaults(today);
        assert_eq!(params.symbol, "MSFT");
        assert_eq!(params.initial_investment, 1000.0);
        assert_eq!(params.start_date, date(2015, 1, 1));
        assert_eq!(params.end_date, today);
    }

    #[test]
    fn query_pass_parses_filled_fields() {
        let query = actix_web::web::Query::<ReturnsQuery>::from_query(
            "symbol=aapl&investment=+250.5&start=2019-05-01&end=2019-06-01",
        )
        .unwrap()
        .into_inner();
        assert_eq!(query.symbol.as_deref(), Some("aapl"));
        assert_eq!(query.investment, Some(250.5));
        assert_eq!(query.start, Some(date(2019, 5, 1)));
        assert_eq!(query.end, Some(date(2019, 6, 1)));
    }

    #[test]
    fn query_fail_bad_number() {
        let result = actix_web::web::Query::<ReturnsQuery>::from_query("investment=lots");
        assert!(result.is_err());
    }

    #[test]
    fn validate_fail_small_investment() {
        let result = validate(&params(0.5));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn validate_fail_empty_symbol() {
        let mut p = params(100.0);
        p.symbol = String::new();
        assert!(matches!(validate(&p), Err(AppError::InvalidInput(_))));
    }

    #[actix_web::test]
    async fn compute_returns_pass() {
        let source = StubSource::with_closes(&[100.0, 120.0, 150.0]);
        let report = compute_returns(&source, params(1000.0)).await.unwrap();

        assert_eq!(source.calls.get(), 1);
        assert_eq!(report.series.points().len(), 3);
        assert_eq!(report.summary.final_value, 1500.0);
        assert_eq!(report.summary.return_pct, 50.0);
        assert_eq!(report.frame.x_range, (date(2020, 1, 1), date(2020, 1, 3)));
        assert_eq!(
            report.status.total_return,
            "Total return on investment is: 50.00 %"
        );
    }

    #[actix_web::test]
    async fn compute_returns_fail_no_data() {
        let source = StubSource::with_closes(&[]);
        let result = compute_returns(&source, params(1000.0)).await;
        match result {
            Err(AppError::NoData { symbol, start, end }) => {
                assert_eq!(symbol, "MSFT");
                assert_eq!(start, date(2020, 1, 1));
                assert_eq!(end, date(2020, 1, 31));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[actix_web::test]
    async fn compute_returns_fail_provider() {
        let mut source = StubSource::with_closes(&[1.0]);
        source.fail_with = Some(|| FinnhubError::Unauthorized("Invalid API key.".to_string()));
        let result = compute_returns(&source, params(1000.0)).await;
        assert!(matches!(result, Err(AppError::Provider(FinnhubError::Unauthorized(_)))));
    }

    #[actix_web::test]
    async fn compute_returns_fail_invalid_input_skips_fetch() {
        let source = StubSource::with_closes(&[1.0]);
        let result = compute_returns(&source, params(0.0)).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(source.calls.get(), 0);
    }

    #[actix_web::test]
    async fn compute_returns_fail_zero_reference() {
        let source = StubSource::with_closes(&[0.0, 5.0]);
        let result = compute_returns(&source, params(1000.0)).await;
        assert!(matches!(result, Err(AppError::Returns(_))));
    }
}
