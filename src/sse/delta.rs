//! Delta extraction and response accumulation.
//!
//! Each event payload carries at most one content delta, in either of two
//! incompatible encodings depending on which convention the backend fronts:
//!
//! - plain: `{"response": "<partial text>"}`
//! - OpenAI-style: `{"choices": [{"delta": {"content": "<partial text>"}}]}`
//!
//! The accumulator works with both without configuration, folding every
//! delta into a response string that only grows for the lifetime of one
//! exchange.

use serde_json::Value;

/// Literal payload marking the intentional end of the content stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Check whether a payload is the stream-termination sentinel.
///
/// The sentinel is not parseable content; callers must check for it before
/// ingesting and stop processing the current batch on a match.
pub fn is_done(payload: &str) -> bool {
    payload == DONE_SENTINEL
}

/// Pull the content delta out of a parsed payload, trying the plain shape
/// first and the OpenAI-style shape second.
///
/// Total over any JSON value: every nesting level is checked for existence
/// before descent, and a payload matching neither shape resolves to `None`
/// rather than an error.
fn extract_delta(payload: &Value) -> Option<&str> {
    if let Some(text) = payload.get("response").and_then(Value::as_str) {
        if !text.is_empty() {
            return Some(text);
        }
    }

    payload
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

/// Folds event payload deltas into a monotonically growing response string.
///
/// One accumulator serves exactly one exchange; start the next exchange
/// with a fresh one.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    /// Accumulated response text. Only ever grows.
    response: String,
}

impl DeltaAccumulator {
    /// Create an accumulator with an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one event payload and return the extracted delta.
    ///
    /// The delta (possibly empty) has already been appended to the running
    /// response when this returns. A payload that fails JSON parsing is
    /// recovered locally: it is logged and contributes nothing, so one bad
    /// record cannot kill an otherwise-healthy stream. A payload that
    /// parses but matches neither known shape contributes nothing,
    /// silently.
    pub fn ingest(&mut self, payload: &str) -> String {
        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("malformed event payload ({}), treating as empty delta", e);
                return String::new();
            }
        };

        let delta = extract_delta(&value).unwrap_or_default().to_string();
        self.response.push_str(&delta);
        delta
    }

    /// The full response accumulated so far.
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Consume the accumulator, yielding the final response text.
    pub fn into_response(self) -> String {
        self.response
    }
}
