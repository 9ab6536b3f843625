use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::Response;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::domain::models::{SubtitleCandidate, TitleCandidate};

// Endpoint constants verified against the official .NET wrapper:
// https://github.com/moviecollection/sub-source
const API_BASE_URL: &str = "https://api.subsource.net";
const SEARCH_PATH: &str = "/api/v1/movies/search";
const SUBTITLES_PATH: &str = "/api/v1/subtitles";
const AUTH_HEADER: &str = "X-API-Key";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("API key invalid or expired (HTTP {0})")]
    Auth(u16),
    #[error("rate limit exceeded after {0} attempts")]
    RateLimitExceeded(usize),
    #[error("server error: HTTP {0}")]
    Http(u16),
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("unexpected API response shape ({0})")]
    MalformedResponse(String),
}

impl CatalogError {
    /// Only an auth failure aborts the whole run; everything else is
    /// scoped to the current file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CatalogError::Auth(_))
    }
}

/// Sleeping is behind a trait so tests can record backoff decisions
/// instead of actually waiting.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Explicit retry state handed to the client at construction.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    /// Backoff after a timeout or connection failure.
    pub connect_backoff: [Duration; 2],
    /// Backoff after a 5xx.
    pub server_backoff: [Duration; 2],
    /// Used when a 429 carries no Retry-After header.
    pub rate_limit_fallback: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            connect_backoff: [Duration::from_millis(500), Duration::from_millis(1500)],
            server_backoff: [Duration::from_secs(1), Duration::from_secs(3)],
            rate_limit_fallback: Duration::from_secs(5),
        }
    }
}

/// Per-attempt classification of a failed request.
enum RequestFailure {
    RateLimited { retry_after: Duration },
    Server(u16),
    Transient(reqwest::Error),
    Fatal(CatalogError),
}

fn run_with_retry<T>(
    policy: &RetryPolicy,
    sleeper: &mut dyn Sleeper,
    mut op: impl FnMut() -> Result<T, RequestFailure>,
) -> Result<T, CatalogError> {
    let last = policy.max_attempts - 1;
    for attempt in 0..policy.max_attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(RequestFailure::Fatal(e)) => return Err(e),
            Err(RequestFailure::RateLimited { retry_after }) => {
                if attempt == last {
                    return Err(CatalogError::RateLimitExceeded(policy.max_attempts));
                }
                println!("Rate limited, waiting {}s...", retry_after.as_secs());
                sleeper.sleep(retry_after);
            }
            Err(RequestFailure::Server(status)) => {
                if attempt == last {
                    return Err(CatalogError::Http(status));
                }
                let backoff = policy.server_backoff[attempt.min(1)];
                log::warn!("server error HTTP {status}, retrying in {backoff:?}");
                sleeper.sleep(backoff);
            }
            Err(RequestFailure::Transient(e)) => {
                if attempt == last {
                    return Err(CatalogError::Network(e));
                }
                let backoff = policy.connect_backoff[attempt.min(1)];
                log::warn!("network error ({e}), retrying in {backoff:?}");
                sleeper.sleep(backoff);
            }
        }
    }
    unreachable!("retry loop always returns within max_attempts")
}

/// The remote catalog surface the orchestrator depends on. Implemented by
/// the HTTP client and by in-memory fakes in tests.
pub trait Catalog {
    fn search(
        &mut self,
        query: &str,
        year: Option<u16>,
    ) -> Result<Vec<TitleCandidate>, CatalogError>;

    fn list_subtitles(
        &mut self,
        title_id: u64,
        language: &str,
    ) -> Result<Vec<SubtitleCandidate>, CatalogError>;

    fn download(&mut self, subtitle_id: u64) -> Result<Vec<u8>, CatalogError>;
}

pub struct CatalogClient {
    http: reqwest::blocking::Client,
    api_key: String,
    retry: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
    debug_dir: PathBuf,
}

impl CatalogClient {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_parts(api_key, RetryPolicy::default(), Box::new(ThreadSleeper))
    }

    pub fn with_parts(
        api_key: String,
        retry: RetryPolicy,
        sleeper: Box<dyn Sleeper>,
    ) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("subdl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_key,
            retry,
            sleeper,
            debug_dir: PathBuf::from("."),
        })
    }

    fn get(&mut self, path: &str, query: &[(&str, String)]) -> Result<Response, CatalogError> {
        let url = format!("{API_BASE_URL}{path}");
        let http = &self.http;
        let api_key = &self.api_key;
        let rate_limit_fallback = self.retry.rate_limit_fallback;
        run_with_retry(&self.retry, self.sleeper.as_mut(), || {
            let response = http
                .get(&url)
                .header(AUTH_HEADER, api_key)
                .header("Accept", "application/json")
                .query(query)
                .send()
                .map_err(classify_send_error)?;
            classify_status(response, rate_limit_fallback)
        })
    }
}

impl Catalog for CatalogClient {
    fn search(
        &mut self,
        query: &str,
        year: Option<u16>,
    ) -> Result<Vec<TitleCandidate>, CatalogError> {
        let mut params = vec![
            ("searchType", "text".to_string()),
            ("q", query.to_string()),
        ];
        if let Some(year) = year {
            params.push(("year", year.to_string()));
        }
        let body = self
            .get(SEARCH_PATH, &params)?
            .text()
            .map_err(CatalogError::Network)?;
        log::debug!("search response: {}", truncated(&body));
        parse_list(&body, &self.debug_dir)
    }

    fn list_subtitles(
        &mut self,
        title_id: u64,
        language: &str,
    ) -> Result<Vec<SubtitleCandidate>, CatalogError> {
        let params = vec![
            ("movieId", title_id.to_string()),
            ("language", language.to_string()),
        ];
        let body = self
            .get(SUBTITLES_PATH, &params)?
            .text()
            .map_err(CatalogError::Network)?;
        log::debug!("subtitles response: {}", truncated(&body));
        parse_list(&body, &self.debug_dir)
    }

    fn download(&mut self, subtitle_id: u64) -> Result<Vec<u8>, CatalogError> {
        let path = format!("/api/v1/subtitles/{subtitle_id}/download");
        let bytes = self
            .get(&path, &[])?
            .bytes()
            .map_err(CatalogError::Network)?;
        Ok(bytes.to_vec())
    }
}

fn classify_send_error(error: reqwest::Error) -> RequestFailure {
    if error.is_timeout() || error.is_connect() {
        RequestFailure::Transient(error)
    } else {
        RequestFailure::Fatal(CatalogError::Network(error))
    }
}

fn classify_status(
    response: Response,
    rate_limit_fallback: Duration,
) -> Result<Response, RequestFailure> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(RequestFailure::Fatal(CatalogError::Auth(status.as_u16())));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(rate_limit_fallback);
        return Err(RequestFailure::RateLimited { retry_after });
    }
    if status.is_server_error() {
        return Err(RequestFailure::Server(status.as_u16()));
    }
    if !status.is_success() {
        return Err(RequestFailure::Fatal(CatalogError::Http(status.as_u16())));
    }
    Ok(response)
}

/// The API wraps lists as `{"data": [...]}` or `{"items": [...]}`, and has
/// been seen serving bare arrays. Anything else is malformed: the raw body
/// is preserved verbatim for inspection, never coerced into partial data.
fn parse_list<T: DeserializeOwned>(body: &str, debug_dir: &Path) -> Result<Vec<T>, CatalogError> {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return Err(malformed(body, debug_dir)),
    };
    let items = match &value {
        serde_json::Value::Array(_) => value.clone(),
        serde_json::Value::Object(map) => match map.get("data").or_else(|| map.get("items")) {
            Some(list) if list.is_array() => list.clone(),
            _ => return Err(malformed(body, debug_dir)),
        },
        _ => return Err(malformed(body, debug_dir)),
    };
    serde_json::from_value(items).map_err(|_| malformed(body, debug_dir))
}

fn malformed(body: &str, debug_dir: &Path) -> CatalogError {
    let note = match save_debug_body(body, debug_dir) {
        Some(path) => format!("raw body saved to {}", path.display()),
        None => "raw body could not be saved".to_string(),
    };
    CatalogError::MalformedResponse(note)
}

fn save_debug_body(body: &str, dir: &Path) -> Option<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!(".subdl_debug_{stamp}.json"));
    match fs::write(&path, body) {
        Ok(()) => Some(path),
        Err(e) => {
            log::warn!("could not save a debug copy of the API response: {e}");
            None
        }
    }
}

fn truncated(body: &str) -> &str {
    match body.char_indices().nth(500) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Vec<Duration>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&mut self, duration: Duration) {
            self.sleeps.push(duration);
        }
    }

    #[test]
    fn rate_limit_hint_is_honored_then_retried_once() {
        let policy = RetryPolicy::default();
        let mut sleeper = RecordingSleeper::default();
        let mut calls = 0;

        let result = run_with_retry(&policy, &mut sleeper, || {
            calls += 1;
            if calls == 1 {
                Err(RequestFailure::RateLimited {
                    retry_after: Duration::from_secs(5),
                })
            } else {
                Ok("body")
            }
        });

        assert_eq!(result.unwrap(), "body");
        assert_eq!(calls, 2);
        assert_eq!(sleeper.sleeps, vec![Duration::from_secs(5)]);
        assert!(sleeper.sleeps[0] >= Duration::from_secs(5));
    }

    #[test]
    fn rate_limit_exhaustion_is_bounded() {
        let policy = RetryPolicy::default();
        let mut sleeper = RecordingSleeper::default();

        let result: Result<(), _> = run_with_retry(&policy, &mut sleeper, || {
            Err(RequestFailure::RateLimited {
                retry_after: Duration::from_secs(2),
            })
        });

        assert!(matches!(result, Err(CatalogError::RateLimitExceeded(3))));
        // Two sleeps: the third attempt fails without sleeping again.
        assert_eq!(sleeper.sleeps.len(), 2);
    }

    #[test]
    fn auth_failures_are_never_retried() {
        let policy = RetryPolicy::default();
        let mut sleeper = RecordingSleeper::default();
        let mut calls = 0;

        let result: Result<(), _> = run_with_retry(&policy, &mut sleeper, || {
            calls += 1;
            Err(RequestFailure::Fatal(CatalogError::Auth(401)))
        });

        assert!(matches!(result, Err(CatalogError::Auth(401))));
        assert_eq!(calls, 1);
        assert!(sleeper.sleeps.is_empty());
    }

    #[test]
    fn server_errors_back_off_one_then_three_seconds() {
        let policy = RetryPolicy::default();
        let mut sleeper = RecordingSleeper::default();
        let mut calls = 0;

        let result = run_with_retry(&policy, &mut sleeper, || {
            calls += 1;
            if calls < 3 {
                Err(RequestFailure::Server(503))
            } else {
                Ok(())
            }
        });

        assert!(result.is_ok());
        assert_eq!(
            sleeper.sleeps,
            vec![Duration::from_secs(1), Duration::from_secs(3)]
        );
    }

    #[test]
    fn parse_list_accepts_the_three_envelope_shapes() {
        let temp = TempDir::new().unwrap();
        let body = r#"{"data": [{"movieId": 1, "title": "Inception"}]}"#;
        let titles: Vec<TitleCandidate> = parse_list(body, temp.path()).unwrap();
        assert_eq!(titles[0].title, "Inception");

        let body = r#"{"items": [{"movieId": 2, "title": "Memento"}]}"#;
        let titles: Vec<TitleCandidate> = parse_list(body, temp.path()).unwrap();
        assert_eq!(titles[0].id, 2);

        let body = r#"[{"movieId": 3, "title": "Dunkirk"}]"#;
        let titles: Vec<TitleCandidate> = parse_list(body, temp.path()).unwrap();
        assert_eq!(titles[0].id, 3);
    }

    #[test]
    fn empty_data_list_is_valid_and_writes_no_artifact() {
        let temp = TempDir::new().unwrap();
        let titles: Vec<TitleCandidate> = parse_list(r#"{"data": []}"#, temp.path()).unwrap();
        assert!(titles.is_empty());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn malformed_body_is_preserved_verbatim() {
        let temp = TempDir::new().unwrap();
        let body = r#"{"unexpected": "shape"}"#;
        let result: Result<Vec<TitleCandidate>, _> = parse_list(body, temp.path());
        assert!(matches!(result, Err(CatalogError::MalformedResponse(_))));

        let artifact = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .find(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().starts_with(".subdl_debug_"))
                    .unwrap_or(false)
            })
            .expect("debug artifact should exist");
        assert_eq!(fs::read_to_string(artifact).unwrap(), body);
    }

    #[test]
    fn non_json_body_is_malformed() {
        let temp = TempDir::new().unwrap();
        let result: Result<Vec<TitleCandidate>, _> =
            parse_list("<html>not json</html>", temp.path());
        assert!(matches!(result, Err(CatalogError::MalformedResponse(_))));
    }

    #[test]
    fn candidate_missing_its_id_is_malformed_not_coerced() {
        let temp = TempDir::new().unwrap();
        let body = r#"{"data": [{"title": "No Id Here"}]}"#;
        let result: Result<Vec<TitleCandidate>, _> = parse_list(body, temp.path());
        assert!(matches!(result, Err(CatalogError::MalformedResponse(_))));
    }
}
