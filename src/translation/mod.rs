mod backend;
mod client;
mod coalesce;
mod dispatch;
mod error;
mod language;
mod mock;
mod orchestrator;
mod resolve;
mod settings;
mod writer;

pub use backend::{
    BatchTranslated, ERROR_FALLBACK_PROVIDER, Translated, TranslationBackend, is_degraded_provider,
};
pub use client::{
    BackendClient, BackendSettings, DEFAULT_BATCH_TIMEOUT, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_FALLBACK_URL, DEFAULT_SECRET_HEADER, DEFAULT_SINGLE_TIMEOUT,
};
pub use coalesce::{
    CoalescedRequest, Consumer, FieldSpec, Item, Provenance, RequestCoalescer, SkipReason,
    entity_id, skip_reason,
};
pub use dispatch::{BatchDispatcher, DispatchReport};
pub use error::BackendError;
pub use language::{
    CHINESE, EMPTY_TEXT_TAG, ENGLISH, JAPANESE, KOREAN, LanguageClassifier, SUPPORTED_LANGUAGES,
    UNKNOWN, classify, print_languages, validate_language,
};
pub use mock::{MOCK_PROVIDER, MockBackend, MockCall, MockMode};
pub use orchestrator::{Orchestrator, PassReport};
pub use resolve::{CacheResolver, Resolution};
pub use settings::{PipelineSettings, SkipRules};
pub use writer::CacheWriter;
