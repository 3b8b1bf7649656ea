//! Concurrent batch dispatch of cache misses to the backend.

use futures_util::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::backend::{ERROR_FALLBACK_PROVIDER, TranslationBackend, is_degraded_provider};
use super::coalesce::{CoalescedRequest, Item};
use super::BackendError;
use crate::cache::NewEntry;

/// What a dispatch produced.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Genuine translations eligible for the cache.
    pub new_entries: Vec<NewEntry>,
    pub translated: usize,
    /// Keys answered with echoed or fallback text.
    pub degraded: usize,
    pub failed_chunks: usize,
    /// Failed chunks the backend refused for a bad or missing shared secret.
    pub rejected_chunks: usize,
}

/// Requests sharing one (source, target) language pair, at most `chunk_size` long.
struct Chunk {
    index: usize,
    source_lang: String,
    target_lang: String,
    requests: Vec<CoalescedRequest>,
}

struct ChunkOutcome {
    requests: Vec<CoalescedRequest>,
    texts: Vec<String>,
    provider: String,
    model: Option<String>,
    failed: bool,
    rejected: bool,
}

impl ChunkOutcome {
    /// Echoes the chunk's own input under the error-fallback label.
    fn echo(requests: Vec<CoalescedRequest>, rejected: bool) -> Self {
        let texts = requests.iter().map(|r| r.text.clone()).collect();
        Self {
            requests,
            texts,
            provider: ERROR_FALLBACK_PROVIDER.to_string(),
            model: None,
            failed: true,
            rejected,
        }
    }
}

pub struct BatchDispatcher {
    backend: Arc<dyn TranslationBackend>,
    chunk_size: usize,
    concurrency: usize,
    model_label: String,
}

impl BatchDispatcher {
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        chunk_size: usize,
        concurrency: usize,
        model_label: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            chunk_size: chunk_size.max(1),
            concurrency: concurrency.max(1),
            model_label: model_label.into(),
        }
    }

    /// Partitions `misses` by language pair and splits each partition into chunks.
    fn plan(&self, misses: Vec<CoalescedRequest>) -> Vec<Chunk> {
        let mut partitions: BTreeMap<(String, String), Vec<CoalescedRequest>> = BTreeMap::new();
        for request in misses {
            partitions
                .entry((request.source_lang.clone(), request.key.target_lang.clone()))
                .or_default()
                .push(request);
        }

        let mut chunks = Vec::new();
        for ((source_lang, target_lang), mut requests) in partitions {
            while !requests.is_empty() {
                let take = requests.len().min(self.chunk_size);
                chunks.push(Chunk {
                    index: chunks.len(),
                    source_lang: source_lang.clone(),
                    target_lang: target_lang.clone(),
                    requests: requests.drain(..take).collect(),
                });
            }
        }
        chunks
    }

    async fn run_chunk(&self, chunk: Chunk) -> ChunkOutcome {
        let texts: Vec<String> = chunk.requests.iter().map(|r| r.text.clone()).collect();

        let result = self
            .backend
            .translate_batch(&texts, &chunk.source_lang, &chunk.target_lang)
            .await
            .and_then(|batch| {
                if batch.texts.len() == texts.len() {
                    Ok(batch)
                } else {
                    Err(BackendError::LengthMismatch {
                        expected: texts.len(),
                        actual: batch.texts.len(),
                    })
                }
            });

        match result {
            Ok(batch) => {
                debug!(
                    chunk = chunk.index,
                    size = texts.len(),
                    provider = %batch.provider,
                    "chunk translated"
                );
                ChunkOutcome {
                    requests: chunk.requests,
                    texts: batch.texts,
                    provider: batch.provider,
                    model: batch.model,
                    failed: false,
                    rejected: false,
                }
            }
            Err(err) if err.is_auth() => {
                error!(
                    chunk = chunk.index,
                    size = texts.len(),
                    error = %err,
                    "backend rejected the shared secret, returning original text"
                );
                ChunkOutcome::echo(chunk.requests, true)
            }
            Err(err) => {
                warn!(
                    chunk = chunk.index,
                    size = texts.len(),
                    source_lang = %chunk.source_lang,
                    target_lang = %chunk.target_lang,
                    error = %err,
                    "chunk failed, returning original text"
                );
                ChunkOutcome::echo(chunk.requests, false)
            }
        }
    }

    /// Translates every miss and writes results into the consumers' items.
    ///
    /// Chunks run concurrently up to the configured limit. A failed chunk
    /// echoes its input and never affects its siblings. Results are matched
    /// back through each request's key, not through chunk position.
    pub async fn dispatch(
        &self,
        misses: Vec<CoalescedRequest>,
        items: &mut [Item],
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        if misses.is_empty() {
            return report;
        }

        let chunks = self.plan(misses);
        debug!(
            chunks = chunks.len(),
            concurrency = self.concurrency,
            "dispatching cache misses"
        );

        let outcomes: Vec<ChunkOutcome> = stream::iter(chunks)
            .map(|chunk| self.run_chunk(chunk))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            let cacheable = !outcome.failed && !is_degraded_provider(&outcome.provider);
            if outcome.failed {
                report.failed_chunks += 1;
            }
            if outcome.rejected {
                report.rejected_chunks += 1;
            }

            for (request, text) in outcome.requests.into_iter().zip(outcome.texts) {
                request.apply(items, &text);

                if !cacheable {
                    report.degraded += 1;
                    continue;
                }

                report.translated += 1;
                report.new_entries.push(NewEntry {
                    key: request.key,
                    source_lang: request.source_lang,
                    source_hash: request.source_hash,
                    translated_text: text,
                    provider: outcome.provider.clone(),
                    model: outcome
                        .model
                        .clone()
                        .unwrap_or_else(|| self.model_label.clone()),
                });
            }
        }

        report
    }
}
