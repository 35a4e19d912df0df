//! Incremental SSE stream decoding.
//!
//! Decodes the streaming chat response format: one or more `data: <json>`
//! lines per record, records separated by a blank line, lines starting with
//! `:` are comments, and an optional trailing `[DONE]` record marks the end
//! of the content stream.
//!
//! # Module structure
//! - `demux` - Chunk-to-record demultiplexing (StreamDemuxer)
//! - `delta` - Delta extraction and accumulation (DeltaAccumulator)

mod delta;
mod demux;

// Re-export public types
pub use delta::{is_done, DeltaAccumulator, DONE_SENTINEL};
pub use demux::StreamDemuxer;
