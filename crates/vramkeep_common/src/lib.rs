//! Shared foundational types for the VRAM Keep model cache.
//!
//! This crate provides the content fingerprint used for cache key
//! derivation and helpers for rendering byte quantities in logs and
//! status strings.

#![warn(missing_docs)]

pub mod bytes;
pub mod fingerprint;

pub use bytes::format_bytes;
pub use fingerprint::Fingerprint;
