//! HTTP, WebSocket and TCP ingest surface around the connwatch pipeline.

pub mod api;
pub mod app;
pub mod config;
pub mod pipeline;
pub mod tcp;
pub mod util;
