//! HTTP client for the movie detail API.
//!
//! Optionally throttled to a minimum interval between requests, shared by all workers.

use super::error::FetchError;
use super::models::{CastEntry, TitleDetail};
use super::role_label::coerce_role_label;
use super::DetailFetcher;
use crate::config::DetailApiSettings;
use anyhow::Result;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

const API_KEY_HEADER: &str = "x-api-key";

pub struct HttpDetailFetcher {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    min_request_interval: Duration,
    last_request: Mutex<Instant>,
}

#[derive(Deserialize)]
struct DetailResponse {
    title: Option<String>,
    year: Option<i32>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    directors: Vec<NamedValue>,
    rating: Option<f64>,
    votes: Option<i64>,
    #[serde(default)]
    runtimes: Vec<JsonValue>,
    runtime: Option<JsonValue>,
    #[serde(default)]
    cast: Vec<CastMember>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NamedValue {
    Plain(String),
    Named { name: String },
}

impl NamedValue {
    fn into_name(self) -> String {
        match self {
            NamedValue::Plain(name) | NamedValue::Named { name } => name,
        }
    }
}

#[derive(Deserialize)]
struct CastMember {
    #[serde(alias = "personID", alias = "id", default)]
    person_id: JsonValue,
    #[serde(default)]
    name: String,
    #[serde(alias = "currentRole", default)]
    role: JsonValue,
}

/// Person IDs arrive either as strings or as bare numbers.
fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Runtimes come as minutes, either numeric or strings like "121" / "121 min".
fn parse_runtime_minutes(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.split_whitespace().next()?.parse().ok(),
        _ => None,
    }
}

impl DetailResponse {
    fn into_detail(self, title_id: &str) -> TitleDetail {
        let runtime = self
            .runtimes
            .first()
            .or(self.runtime.as_ref())
            .and_then(parse_runtime_minutes);

        let cast = self
            .cast
            .into_iter()
            .filter_map(|member| match scalar_to_string(&member.person_id) {
                Some(person_id) => Some(CastEntry {
                    person_id,
                    name: member.name,
                    role: coerce_role_label(&member.role),
                }),
                None => {
                    debug!("Dropping cast member without person id in {}", title_id);
                    None
                }
            })
            .collect();

        TitleDetail {
            title: self.title,
            year: self.year,
            genres: self.genres,
            directors: self.directors.into_iter().map(NamedValue::into_name).collect(),
            rating: self.rating,
            votes: self.votes,
            runtime,
            cast,
        }
    }
}

/// Decode a successful response body.
fn parse_detail_body(body: &str, title_id: &str) -> Result<TitleDetail, FetchError> {
    let parsed: DetailResponse =
        serde_json::from_str(body).map_err(|e| FetchError::InvalidResponse(e.to_string()))?;
    Ok(parsed.into_detail(title_id))
}

/// Map a non-success HTTP status to the fetch error taxonomy.
fn classify_status(status: StatusCode, title_id: &str) -> FetchError {
    if status == StatusCode::NOT_FOUND {
        FetchError::DetailUnavailable(format!("no record for {}", title_id))
    } else if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        FetchError::TransientFetchError(format!("detail API returned {}", status))
    } else {
        FetchError::DetailUnavailable(format!("detail API returned {}", status))
    }
}

impl HttpDetailFetcher {
    pub fn new(settings: &DetailApiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        let min_request_interval = Duration::from_millis(settings.min_request_interval_ms);

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            min_request_interval,
            last_request: Mutex::new(Instant::now() - min_request_interval),
        })
    }

    fn rate_limit(&self) {
        if self.min_request_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().unwrap();
        let elapsed = last.elapsed();
        if elapsed < self.min_request_interval {
            std::thread::sleep(self.min_request_interval - elapsed);
        }
        *last = Instant::now();
    }

    fn detail_url(&self, title_id: &str) -> String {
        format!("{}/titles/{}", self.base_url, urlencoding::encode(title_id))
    }
}

impl DetailFetcher for HttpDetailFetcher {
    fn fetch_detail(&self, title_id: &str) -> Result<TitleDetail, FetchError> {
        self.rate_limit();

        let mut request = self.client.get(self.detail_url(title_id));
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        let response = request
            .send()
            .map_err(|e| FetchError::TransientFetchError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, title_id));
        }

        let body = response
            .text()
            .map_err(|e| FetchError::TransientFetchError(e.to_string()))?;
        parse_detail_body(&body, title_id)
    }
}
