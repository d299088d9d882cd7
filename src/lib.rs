//! `mp3feed`: incremental MP3 decoding behind `std::io::Read`.
//!
//! This crate provides:
//! - A decoder handle (`Decoder`) with explicit lifecycle and output format control
//! - A streaming adapter (`DecoderReader`) that pulls compressed bytes from any reader and
//!   serves decoded PCM, without buffering whole inputs or outputs
//! - A pluggable engine seam (`Engine`) with a Symphonia-backed implementation
//!
//! Typical use: create a `Decoder`, call `open_feed`, convert it with `decoder_reader`, then
//! read PCM from the result (e.g. with `std::io::copy`).

// Handle and streaming adapter (most consumers start here).
pub mod decoder;
pub mod decoder_reader;
pub mod opts;

// Engine interface and implementations.
pub mod engine;
pub mod engines;

// Output format description.
pub mod encoding;
pub mod format;

pub mod error;

// Logging configuration.
#[cfg(feature = "logging")]
pub mod logging;

pub use decoder::Decoder;
pub use decoder_reader::{DEFAULT_CHUNK_SIZE, DecoderReader};
pub use encoding::Encoding;
pub use engine::{Engine, EngineError, Status};
pub use engines::symphonia::{SymphoniaEngine, init};
pub use error::{Error, Result};
pub use format::{FormatTable, OutputFormat};
pub use opts::ReaderOpts;
