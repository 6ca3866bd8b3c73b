// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Payload, RequestError, TargetKey};
use serde_json::Value;
use tracing::debug;

pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// How a request attempt ended, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The request never produced an HTTP response.
    Transport { error: String },
    Response { status: u16, body: String },
}

impl Completion {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::Response {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Response { status, .. } if (200..300).contains(status))
    }
}

/// Best-effort text for a failed response: the JSON `message` field, then
/// the JSON itself, then the raw body, then a generic fallback.
pub fn failure_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return GENERIC_FAILURE_MESSAGE.to_owned();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => match map.get("message") {
            Some(Value::String(message)) if !message.trim().is_empty() => message.clone(),
            _ => Value::Object(map).to_string(),
        },
        Ok(Value::Null) | Err(_) => trimmed.to_owned(),
        Ok(other) => other.to_string(),
    }
}

/// Decodes a completed request for the renderer bound to `target`.
///
/// `Ok(None)` means the request succeeded but nothing is bound to render it.
pub fn dispatch(
    target: Option<TargetKey>,
    completion: &Completion,
) -> Result<Option<Payload>, RequestError> {
    let body = match completion {
        Completion::Transport { error } => {
            let message = if error.trim().is_empty() {
                GENERIC_FAILURE_MESSAGE.to_owned()
            } else {
                error.clone()
            };
            return Err(RequestError::TransportFailure(message));
        }
        Completion::Response { status, body } if !completion.is_success() => {
            debug!(status, "request failed");
            return Err(RequestError::TransportFailure(failure_message(body)));
        }
        Completion::Response { body, .. } => body,
    };

    let raw = if body.trim().is_empty() { "{}" } else { body };
    let value: Value = serde_json::from_str(raw)
        .map_err(|error| RequestError::MalformedResponse(format!("parse response: {error}")))?;

    let Some(target) = target else {
        return Ok(None);
    };
    Payload::decode(target, value).map(Some)
}
