//! clickledger - per-product affiliate click counter
//!
//! Every product barcode is served by its own counter object: a tokio task
//! that owns the barcode's persisted state and handles one command at a
//! time, so concurrent clicks on one product never lose updates. When the
//! durable counter cannot answer in time, clicks degrade to a shared
//! best-effort fallback store instead of failing.
//!
//! # Features
//! - **server**: HTTP server mode (default)
//! - **metrics**: Prometheus metrics export
//! - **full**: All features enabled
//!
//! # Architecture
//! - `counter`: counter objects, their mailboxes and the barcode router
//! - `storage`: durable counter state (SeaORM / memory)
//! - `fallback`: degraded count-only store (memory / Redis)
//! - `services`: primary/fallback click counting strategy
//! - `api`: HTTP handlers and middleware
//! - `config`: configuration management
//! - `runtime`: startup, server and shutdown
//! - `system`: logging

pub mod api;
pub mod config;
pub mod counter;
pub mod errors;
pub mod fallback;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod metrics_core;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
