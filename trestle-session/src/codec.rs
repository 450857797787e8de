//! Versioned encoding of session payloads.
//!
//! Session data is a string-keyed map of JSON values wrapped in an envelope
//! carrying a format version: `{"v":1,"d":{...}}`. The same encoding is used
//! for cookie payloads and for backend storage. Decoding never instantiates
//! anything but plain JSON values.

use crate::error::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Session contents.
pub type SessionData = BTreeMap<String, serde_json::Value>;

/// Version written by [`encode`].
pub const CODEC_VERSION: u64 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    v: u64,
    d: &'a SessionData,
}

#[derive(Deserialize)]
struct Envelope {
    v: u64,
    d: serde_json::Value,
}

/// Encode session data as a versioned JSON document.
pub fn encode(data: &SessionData) -> SessionResult<String> {
    serde_json::to_string(&EnvelopeRef {
        v: CODEC_VERSION,
        d: data,
    })
    .map_err(|e| SessionError::Serialization(e.to_string()))
}

/// Decode a document produced by [`encode`].
pub fn decode(encoded: &str) -> SessionResult<SessionData> {
    let envelope: Envelope = serde_json::from_str(encoded)
        .map_err(|e| SessionError::Deserialization(e.to_string()))?;

    if envelope.v != CODEC_VERSION {
        return Err(SessionError::UnsupportedVersion(envelope.v));
    }

    serde_json::from_value(envelope.d).map_err(|e| SessionError::Deserialization(e.to_string()))
}
