use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::backend::{BatchTranslated, Translated, TranslationBackend};
use super::BackendError;

pub const DEFAULT_FALLBACK_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_SECRET_HEADER: &str = "X-Translation-Secret";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_SINGLE_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Provider label used when the backend does not report one.
const UNLABELED_PROVIDER: &str = "backend";

/// Longest slice of an error body kept in error messages.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Connection settings for [`BackendClient`].
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub primary_url: String,
    /// Loopback path to the backend, tried once after the primary fails.
    pub fallback_url: Option<String>,
    pub secret: Option<String>,
    pub secret_header: String,
    pub connect_timeout: Duration,
    pub single_timeout: Duration,
    pub batch_timeout: Duration,
}

impl BackendSettings {
    pub fn new(primary_url: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            primary_url: primary_url.into(),
            fallback_url: Some(DEFAULT_FALLBACK_URL.to_string()),
            secret,
            secret_header: DEFAULT_SECRET_HEADER.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            single_timeout: DEFAULT_SINGLE_TIMEOUT,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
        }
    }

    /// Endpoint candidates in the order they are tried.
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints = vec![normalize_endpoint(&self.primary_url)];
        if let Some(fallback) = &self.fallback_url {
            let fallback = normalize_endpoint(fallback);
            if !fallback.is_empty() && !endpoints.contains(&fallback) {
                endpoints.push(fallback);
            }
        }
        endpoints
    }
}

fn normalize_endpoint(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[derive(Debug, Serialize)]
struct TranslateBody<'a> {
    text: &'a str,
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Debug, Serialize)]
struct BatchBody<'a> {
    texts: &'a [String],
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translated_text: String,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    translations: Vec<String>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

/// HTTP client for the translation backend.
///
/// Each call walks the endpoint candidates in order (primary, then the
/// loopback fallback) and returns the first success.
pub struct BackendClient {
    http: Client,
    endpoints: Vec<String>,
    secret: Option<String>,
    secret_header: String,
    single_timeout: Duration,
    batch_timeout: Duration,
}

impl BackendClient {
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoints: settings.endpoints(),
            secret: settings.secret.clone().filter(|s| !s.is_empty()),
            secret_header: settings.secret_header.clone(),
            single_timeout: settings.single_timeout,
            batch_timeout: settings.batch_timeout,
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    async fn post_json<B, R>(
        &self,
        endpoint: &str,
        secret: &str,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<R, BackendError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{endpoint}/{path}");

        let response = self
            .http
            .post(&url)
            .header(self.secret_header.as_str(), secret)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, &e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Unauthorized {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        response.json::<R>().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout {
                    endpoint: endpoint.to_string(),
                }
            } else {
                BackendError::Decode {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }

    /// Posts `body` to each endpoint candidate in turn until one returns a
    /// response that passes `check`.
    async fn post_with_fallback<B, R, F>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
        check: F,
    ) -> Result<R, BackendError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
        F: Fn(&R) -> Result<(), BackendError> + Sync,
    {
        let Some(secret) = self.secret.as_deref() else {
            return Err(BackendError::MissingSecret);
        };

        let mut last_error = None;

        for (attempt, endpoint) in self.endpoints.iter().enumerate() {
            let result = self
                .post_json::<B, R>(endpoint, secret, path, body, timeout)
                .await
                .and_then(|response| check(&response).map(|()| response));

            match result {
                Ok(response) => {
                    if attempt > 0 {
                        info!(endpoint = %endpoint, path, "backend answered on fallback endpoint");
                    }
                    return Ok(response);
                }
                Err(err) => {
                    warn!(
                        endpoint = %endpoint,
                        path,
                        attempt = attempt + 1,
                        error = %err,
                        "backend endpoint failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        Err(match last_error {
            Some(last) => BackendError::Exhausted {
                attempts: self.endpoints.len(),
                last: Box::new(last),
            },
            None => BackendError::Unreachable {
                endpoint: String::new(),
                message: "no backend endpoints configured".to_string(),
            },
        })
    }
}

fn transport_error(endpoint: &str, err: &reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        BackendError::Unreachable {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }
}

fn provider_label(provider: Option<String>) -> String {
    provider
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| UNLABELED_PROVIDER.to_string())
}

#[async_trait]
impl TranslationBackend for BackendClient {
    async fn translate_one(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Translated, BackendError> {
        let body = TranslateBody {
            text,
            source_lang,
            target_lang,
        };

        let response: TranslateResponse = self
            .post_with_fallback("translate", &body, self.single_timeout, |_| Ok(()))
            .await?;

        debug!(source_lang, target_lang, "single translation received");

        Ok(Translated {
            text: response.translated_text,
            provider: provider_label(response.provider),
            model: response.model,
        })
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<BatchTranslated, BackendError> {
        if texts.is_empty() {
            return Ok(BatchTranslated {
                texts: Vec::new(),
                provider: UNLABELED_PROVIDER.to_string(),
                model: None,
            });
        }

        let body = BatchBody {
            texts,
            source_lang,
            target_lang,
        };
        let expected = texts.len();

        let response: BatchResponse = self
            .post_with_fallback(
                "translate/batch",
                &body,
                self.batch_timeout,
                |response: &BatchResponse| {
                    if response.translations.len() == expected {
                        Ok(())
                    } else {
                        Err(BackendError::LengthMismatch {
                            expected,
                            actual: response.translations.len(),
                        })
                    }
                },
            )
            .await?;

        debug!(count = expected, source_lang, target_lang, "batch translation received");

        Ok(BatchTranslated {
            texts: response.translations,
            provider: provider_label(response.provider),
            model: response.model,
        })
    }
}
