use dotenvy::dotenv;
use finnhub_api::api::{FINNHUB_BASE_API_URL, FinnhubAPI, FinnhubConfig};
use log::{error, info, warn};
use serde::Serialize;
use std::{env, process::exit, time::Duration};

use actix_web::{
    App, HttpResponse, HttpServer, Responder, ResponseError, get, http::header::ContentType,
    middleware::Logger, web,
};

use crate::error::AppError;
use crate::pipeline::{ReturnsQuery, ReturnsReport, compute_returns};

mod error;
mod pipeline;
mod render;
mod utils;

#[derive(Serialize)]
struct HealthcheckResponse {
    status: String,
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn log_failure(err: &AppError) {
    if err.is_provider() {
        error!("provider request failed: {}", err);
    } else {
        warn!("request rejected: {}", err);
    }
}

#[get("/")]
async fn index(query: web::Query<ReturnsQuery>, api: web::Data<FinnhubAPI>) -> impl Responder {
    let params = query.with_defaults(today());
    match compute_returns(api.get_ref(), params.clone()).await {
        Ok(report) => HttpResponse::Ok()
            .content_type(ContentType::html())
            .body(render::page(&report.params, Ok(&report))),
        Err(err) => {
            log_failure(&err);
            HttpResponse::build(err.status_code())
                .content_type(ContentType::html())
                .body(render::page(&params, Err(&err)))
        }
    }
}

#[get("/api/returns")]
async fn api_returns(
    query: web::Query<ReturnsQuery>,
    api: web::Data<FinnhubAPI>,
) -> Result<web::Json<ReturnsReport>, AppError> {
    let params = query.with_defaults(today());
    compute_returns(api.get_ref(), params)
        .await
        .map(web::Json)
        .inspect_err(log_failure)
}

#[get("/healthcheck")]
async fn healthcheck() -> impl Responder {
    web::Json(HealthcheckResponse {
        status: "ok".to_string(),
    })
}

async fn not_found() -> impl Responder {
    HttpResponse::NotFound().json(HealthcheckResponse {
        status: "not found".to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
enum ConfigError {
    #[error("FINNHUB_API_KEY is not set")]
    MissingApiKey,
    #[error("{name} is not a valid number: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

struct Config {
    workers: usize,
    host: String,
    port: u16,
    finnhub: FinnhubConfig,
}

fn env_or(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env_or(name, default);
    value
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { name, value })
}

impl Config {
    fn new() -> Result<Config, ConfigError> {
        dotenv().ok();

        let api_key = env_or("FINNHUB_API_KEY", "");
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        let mut workers: usize = parse_env("RETURNS_APP_WORKERS", "1")?;
        if workers == 0 {
            workers = 1;
        }

        let timeout = match env::var("FINNHUB_TIMEOUT_SECS") {
            Ok(value) if !value.trim().is_empty() => Some(Duration::from_secs(parse_env(
                "FINNHUB_TIMEOUT_SECS",
                "0",
            )?)),
            _ => None,
        };

        let finnhub = FinnhubConfig {
            api_key,
            base_url: env_or("FINNHUB_BASE_URL", FINNHUB_BASE_API_URL),
            timeout,
        };

        let config = Config {
            workers,
            host: env_or("RETURNS_APP_HOST", "0.0.0.0"),
            port: parse_env("RETURNS_APP_PORT", "8080")?,
            finnhub,
        };
        Ok(config)
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let config = match Config::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Could not create config: {}", e);
            exit(1);
        }
    };

    let finnhub_api = match FinnhubAPI::new(config.finnhub) {
        Ok(api) => web::Data::new(api),
        Err(e) => {
            error!("Could not create Finnhub client: {}", e);
            exit(1);
        }
    };

    info!(
        "listening on {}:{} with {} worker(s)",
        config.host, config.port, config.workers
    );

    HttpServer::new(move || {
        App::new()
            .app_data(finnhub_api.clone())
            .service(healthcheck)
            .service(index)
            .service(api_returns)
            .default_service(web::to(not_found))
            .wrap(Logger::default())
    })
    .bind((config.host.as_str(), config.port))?
    .workers(config.workers)
    .run()
    .await
}
