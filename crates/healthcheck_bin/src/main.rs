use serde::Deserialize;
use std::env;

const DEFAULT_HEALTHCHECK_URL: &str = "http://localhost:8080/healthcheck";

#[derive(Debug, thiserror::Error)]
enum CustomError {
    #[error("Reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("Status code != 200 or no healthcheck")]
    NotOk,
}

#[derive(Debug, Deserialize)]
struct StatusJSON {
    status: String,
}

fn healthcheck_url() -> String {
    dotenvy::dotenv().ok();
    env::var("RETURNS_APP_HEALTHCHECK_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HEALTHCHECK_URL.to_string())
}

fn check_body(body: &str) -> Result<(), CustomError> {
    let ok_str: StatusJSON = serde_json::from_str(body).map_err(|_| CustomError::NotOk)?;
    if ok_str.status != "ok" {
        return Err(CustomError::NotOk);
    }
    Ok(())
}

fn main() -> Result<(), CustomError> {
    let res = reqwest::blocking::get(healthcheck_url())?;
    if res.status() != 200 {
        return Err(CustomError::NotOk);
    }
    check_body(&res.text()?)
}
