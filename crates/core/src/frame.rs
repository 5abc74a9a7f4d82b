//! Decoded response frames.
//!
//! Every line of a streamed response (and the whole body of a non-streamed
//! one) is a JSON object with a `choices` array. The shape of the selected
//! choice decides what the frame is:
//!
//! - `choices[0].message`: the full message, carried by the first frame only
//! - `choices[0].delta`  : an incremental fragment, on every later frame
//!
//! Discrimination happens once, here, so consumers match on [`StreamFrame`]
//! instead of probing JSON at each use site.

use crate::citation::Citation;
use crate::error::{Error, Result};
use serde::Deserialize;
use tracing::warn;

/// Only this choice is ever consumed, even when the backend returns more.
pub const SELECTED_CHOICE: usize = 0;

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    FullMessage(FullMessage),
    DeltaFragment(DeltaFragment),
}

/// The complete message with its citations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullMessage {
    pub content: String,
    pub citations: Vec<Citation>,
}

/// An incremental piece of assistant text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaFragment {
    pub content: Option<String>,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    context: Option<ApiContext>,
}

#[derive(Deserialize)]
struct ApiContext {
    #[serde(default)]
    citations: Vec<Citation>,
}

#[derive(Deserialize)]
struct ApiDelta {
    #[serde(default)]
    content: Option<String>,
}

impl StreamFrame {
    /// Parse one line of a streamed response.
    ///
    /// Undecodable JSON is a `MalformedFrame`; a well-formed body with the
    /// wrong shape is an `InvalidResponse`.
    pub fn parse(line: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(line).map_err(|e| Error::malformed(line, e.to_string()))?;
        Self::from_value(value)
    }

    /// Discriminate an already-decoded body.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let Some(body) = value.as_object() else {
            return Err(Error::InvalidResponse("Received invalid response".into()));
        };

        if let Some(error) = body.get("error") {
            return Err(Error::InvalidResponse(format!(
                "Backend reported an error: {error}"
            )));
        }

        let Some(choices) = body.get("choices").and_then(|c| c.as_array()) else {
            return Err(Error::InvalidResponse(
                "Response does not contain choices".into(),
            ));
        };

        if choices.len() > 1 {
            warn!(count = choices.len(), "Response contains multiple choices, using the first");
        }

        // Keep-alive and usage frames may carry an empty array.
        let Some(choice) = choices.get(SELECTED_CHOICE) else {
            return Ok(Self::DeltaFragment(DeltaFragment::default()));
        };

        if let Some(message) = choice.get("message") {
            let message: ApiMessage = serde_json::from_value(message.clone())
                .map_err(|e| Error::InvalidResponse(format!("Invalid message: {e}")))?;
            let citations = message
                .context
                .map(|c| c.citations)
                .unwrap_or_default()
                .into_iter()
                .map(Citation::normalize)
                .collect();
            return Ok(Self::FullMessage(FullMessage {
                content: message.content.unwrap_or_default(),
                citations,
            }));
        }

        if let Some(delta) = choice.get("delta") {
            let delta: ApiDelta = serde_json::from_value(delta.clone())
                .map_err(|e| Error::InvalidResponse(format!("Invalid delta: {e}")))?;
            return Ok(Self::DeltaFragment(DeltaFragment {
                content: delta.content,
            }));
        }

        Err(Error::InvalidResponse(
            "Choice carries neither a message nor a delta".into(),
        ))
    }
}
