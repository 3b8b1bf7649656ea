//! In-process translation backend for tests and local development.
//!
//! Produces deterministic output without a network, records every call and
//! can simulate the failure modes the pipeline has to absorb.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::backend::{BatchTranslated, Translated, TranslationBackend};
use super::BackendError;

pub const MOCK_PROVIDER: &str = "mock";

/// How the mock answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockMode {
    /// `"hello"` → `"hello_eng_Latn"`.
    Suffix,
    /// Echoes the input under a degraded provider label, the way the real
    /// backend behaves after exhausting its own retries.
    Degraded(String),
    /// Every call fails as if the backend could not be reached.
    Error(String),
    /// Every call is refused as if the shared secret were wrong.
    Unauthorized,
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub texts: Vec<String>,
    pub source_lang: String,
    pub target_lang: String,
    pub batch: bool,
}

#[derive(Debug)]
pub struct MockBackend {
    mode: MockMode,
    delay: Duration,
    failing_sources: HashSet<String>,
    calls: Mutex<Vec<MockCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(MockMode::Suffix)
    }
}

impl MockBackend {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            delay: Duration::ZERO,
            failing_sources: HashSet::new(),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Simulated latency per call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes every call whose source language is `source_lang` fail.
    #[must_use]
    pub fn failing_for(mut self, source_lang: impl Into<String>) -> Self {
        self.failing_sources.insert(source_lang.into());
        self
    }

    /// All calls received so far, in arrival order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }

    /// Total number of texts sent across all calls.
    pub fn text_count(&self) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|c| c.texts.len()).sum())
            .unwrap_or_default()
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, texts: &[String], source_lang: &str, target_lang: &str, batch: bool) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(MockCall {
                texts: texts.to_vec(),
                source_lang: source_lang.to_string(),
                target_lang: target_lang.to_string(),
                batch,
            });
        }
    }

    async fn run<T>(
        &self,
        source_lang: &str,
        answer: impl FnOnce(&MockMode) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = if self.failing_sources.contains(source_lang) {
            Err(unavailable(format!("{source_lang} is unavailable")))
        } else {
            answer(&self.mode)
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn unavailable(message: String) -> BackendError {
    BackendError::Unreachable {
        endpoint: MOCK_PROVIDER.to_string(),
        message,
    }
}

fn translate_text(text: &str, target_lang: &str) -> String {
    format!("{text}_{target_lang}")
}

#[async_trait]
impl TranslationBackend for MockBackend {
    async fn translate_one(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Translated, BackendError> {
        self.record(&[text.to_string()], source_lang, target_lang, false);

        self.run(source_lang, |mode| match mode {
            MockMode::Suffix => Ok(Translated {
                text: translate_text(text, target_lang),
                provider: MOCK_PROVIDER.to_string(),
                model: Some("mock-1".to_string()),
            }),
            MockMode::Degraded(label) => Ok(Translated {
                text: text.to_string(),
                provider: label.clone(),
                model: None,
            }),
            MockMode::Error(message) => Err(unavailable(message.clone())),
            MockMode::Unauthorized => Err(BackendError::Unauthorized {
                endpoint: MOCK_PROVIDER.to_string(),
                status: 401,
            }),
        })
        .await
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<BatchTranslated, BackendError> {
        self.record(texts, source_lang, target_lang, true);

        self.run(source_lang, |mode| match mode {
            MockMode::Suffix => Ok(BatchTranslated {
                texts: texts
                    .iter()
                    .map(|text| translate_text(text, target_lang))
                    .collect(),
                provider: MOCK_PROVIDER.to_string(),
                model: Some("mock-1".to_string()),
            }),
            MockMode::Degraded(label) => Ok(BatchTranslated {
                texts: texts.to_vec(),
                provider: label.clone(),
                model: None,
            }),
            MockMode::Error(message) => Err(unavailable(message.clone())),
            MockMode::Unauthorized => Err(BackendError::Unauthorized {
                endpoint: MOCK_PROVIDER.to_string(),
                status: 401,
            }),
        })
        .await
    }
}
