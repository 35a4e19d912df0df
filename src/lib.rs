//! chatstream - a streaming chat client core
//!
//! Streams incremental text responses from an SSE chat endpoint and renders
//! them progressively through a caller-supplied display sink.

pub mod client;
pub mod config;
pub mod models;
pub mod session;
pub mod sink;
pub mod sse;
pub mod transport;
