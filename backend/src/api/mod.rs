//! HTTP API surface shared across modules.

pub mod common;
