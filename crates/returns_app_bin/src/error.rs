use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use finnhub_api::api::FinnhubError;
use returns_calc::ReturnsError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Provider(#[from] FinnhubError),
    #[error("no price data for {symbol} between {start} and {end}")]
    NoData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error(transparent)]
    Returns(ReturnsError),
}

impl AppError {
    /// Attaches the requested range to a calculator error.
    pub fn from_returns(err: ReturnsError, start: NaiveDate, end: NaiveDate) -> Self {
        match err {
            ReturnsError::NoData { symbol } => AppError::NoData { symbol, start, end },
            other => AppError::Returns(other),
        }
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, AppError::Provider(_))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Provider(FinnhubError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::NoData { .. } => StatusCode::NOT_FOUND,
            AppError::Returns(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({"error": self.to_string()}))
    }
}
