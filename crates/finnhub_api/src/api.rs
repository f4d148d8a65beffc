use chrono::{NaiveDate, NaiveTime};
use history_model::{CandleSource, PriceBar, PriceSeries, SeriesError};
use itertools::izip;
use log::debug;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;

pub const FINNHUB_BASE_API_URL: &str = "https://finnhub.io/api/v1";
const TOKEN_HEADER: &str = "x-finnhub-token";
const DAILY_RESOLUTION: &str = "D";

#[derive(Debug, Clone)]
pub struct FinnhubConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl FinnhubConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        FinnhubConfig {
            api_key: api_key.into(),
            base_url: FINNHUB_BASE_API_URL.to_string(),
            timeout: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FinnhubError {
    #[error("api key contains characters not allowed in a header")]
    InvalidApiKey,
    #[error("request to provider failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider rejected credentials: {0}")]
    Unauthorized(String),
    #[error("provider rate limit reached: {0}")]
    RateLimited(String),
    #[error("provider answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("could not decode provider response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("malformed provider response: {0}")]
    Malformed(String),
    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Column-oriented candle payload of `/stock/candle`.
///
/// A `no_data` answer carries only `s`, so every column defaults to empty.
#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
pub struct FinnhubCandlesJSON {
    #[serde(default)]
    pub t: Vec<i64>,
    #[serde(default)]
    pub o: Vec<f64>,
    #[serde(default)]
    pub h: Vec<f64>,
    #[serde(default)]
    pub l: Vec<f64>,
    #[serde(default)]
    pub c: Vec<f64>,
    #[serde(default)]
    pub v: Vec<f64>,
    pub s: String,
}

#[derive(Debug, Deserialize)]
struct FinnhubErrorJSON {
    error: String,
}

pub struct FinnhubAPI {
    base_url: String,
    client: reqwest::Client,
    headers: HeaderMap,
}

impl FinnhubAPI {
    pub fn new(config: FinnhubConfig) -> Result<Self, FinnhubError> {
        let mut headers = HeaderMap::new();
        let token =
            HeaderValue::from_str(&config.api_key).map_err(|_| FinnhubError::InvalidApiKey)?;
        headers.insert(TOKEN_HEADER, token);

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(FinnhubAPI {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
            headers,
        })
    }

    pub async fn get_candles(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, FinnhubError> {
        let timerange = TimeRange::from_dates(start_date, end_date);
        let url = format!(
            "{}/stock/candle?symbol={}&resolution={}&from={}&to={}",
            self.base_url, symbol, DAILY_RESOLUTION, timerange.start, timerange.end
        );

        debug!("get_candles | url: {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!("get_candles | provider error | status: {}", status);
            return Err(status_error(status, &body));
        }

        parse_candles(symbol, &body)
    }
}

impl CandleSource for FinnhubAPI {
    type Error = FinnhubError;

    async fn fetch(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, FinnhubError> {
        self.get_candles(symbol, start_date, end_date).await
    }
}

struct TimeRange {
    start: i64,
    end: i64,
}

impl TimeRange {
    fn from_dates(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        TimeRange {
            start: utc_midnight_timestamp(start_date),
            end: utc_midnight_timestamp(end_date),
        }
    }
}

pub fn utc_midnight_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn status_error(status: StatusCode, body: &str) -> FinnhubError {
    let message = serde_json::from_str::<FinnhubErrorJSON>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FinnhubError::Unauthorized(message),
        StatusCode::TOO_MANY_REQUESTS => FinnhubError::RateLimited(message),
        _ => FinnhubError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

/// Turns a `/stock/candle` body into a series for `symbol`.
pub fn parse_candles(symbol: &str, body: &str) -> Result<PriceSeries, FinnhubError> {
    let json: FinnhubCandlesJSON = serde_json::from_str(body)?;

    match json.s.as_str() {
        "ok" => {}
        "no_data" => return Ok(PriceSeries::from_bars(symbol, vec![])?),
        other => return Err(FinnhubError::Malformed(format!("unexpected status {other:?}"))),
    }

    let len = json.t.len();
    if [json.o.len(), json.h.len(), json.l.len(), json.c.len(), json.v.len()]
        .iter()
        .any(|n| *n != len)
    {
        return Err(FinnhubError::Malformed(
            "candle columns have different lengths".to_string(),
        ));
    }

    let bars = izip!(&json.t, &json.o, &json.h, &json.l, &json.c, &json.v)
        .map(|(t, o, h, l, c, v)| -> Result<PriceBar, FinnhubError> {
            let date = chrono::DateTime::from_timestamp(*t, 0)
                .ok_or_else(|| FinnhubError::Malformed(format!("timestamp {t} out of range")))?
                .date_naive();
            Ok(PriceBar {
                symbol: symbol.to_string(),
                date,
                open: *o,
                high: *h,
                low: *l,
                close: *c,
                volume: v.max(0.0).round() as u64,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PriceSeries::from_bars(symbol, bars)?)
}
