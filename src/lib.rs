//! # transcache - cache-first field translation
//!
//! `transcache` sits in front of a multilingual translation backend and keeps
//! a persistent cache of translated content fields, keyed by entity, field
//! and target language.
//!
//! A translation pass over a list of items:
//!
//! 1. classifies each field's source language and skips texts that need no
//!    translation,
//! 2. coalesces fields that share a cache key into one request,
//! 3. serves fresh cache entries and drops stale ones,
//! 4. sends the misses to the backend in chunks, concurrently,
//! 5. writes genuine translations back with insert-if-absent semantics.
//!
//! Backend failures never fail a pass: affected fields keep their original
//! text and nothing degraded is cached.
//!
//! ## Quick Start
//!
//! ```bash
//! export TRANSCACHE_SECRET="shared-secret"
//!
//! # One field
//! transcache translate --primary-url http://10.0.0.5:8000 \
//!     --entity-type place --entity-id 42 --field title --to eng_Latn "경복궁"
//!
//! # A JSON array of items
//! transcache items places.json --entity-type place --to eng_Latn \
//!     --field title --detect location
//! ```
//!
//! ## Configuration
//!
//! Settings are stored in `~/.config/transcache/config.toml`:
//!
//! ```toml
//! [backend]
//! primary_url = "http://10.0.0.5:8000"
//! fallback_url = "http://127.0.0.1:8000"
//! secret_env = "TRANSCACHE_SECRET"
//!
//! [pipeline]
//! chunk_size = 15
//! concurrency = 5
//! ```

/// Translation cache storage using `SQLite`.
pub mod cache;

/// Command-line interface definitions and handlers.
pub mod cli;

/// Configuration file management and settings resolution.
pub mod config;

/// File system utilities.
pub mod fs;

/// Input reading from files and stdin.
pub mod input;

/// Diagnostic logging setup.
pub mod logging;

/// Global output configuration (quiet mode, colors, stderr/stdout routing).
pub mod output;

/// XDG-style path utilities for configuration and cache.
pub mod paths;

/// Language classification, backend client and the orchestration pipeline.
pub mod translation;

/// Terminal UI components (spinner, colors).
pub mod ui;
