use serde_json::Value;

/// Classified result of a single call.
///
/// `call` never returns a Rust error: transport problems and error statuses
/// are both data, so a caller can always match on what actually happened.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// Success status; the decoded JSON body, unchanged.
    Success(Value),
    /// 4xx/5xx status; the decoded error body, unchanged.
    ApplicationError { status: u16, body: Value },
    /// The exchange itself failed (connect, DNS, TLS, timeout). Terminal,
    /// already logged, never retried.
    TransportFailure,
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }

    /// The body on success, `None` otherwise.
    pub fn success(self) -> Option<Value> {
        match self {
            CallOutcome::Success(body) => Some(body),
            _ => None,
        }
    }

    /// Collapses the outcome to its body. Transport failures become an
    /// empty object, matching the legacy empty-mapping contract.
    pub fn into_body(self) -> Value {
        match self {
            CallOutcome::Success(body) => body,
            CallOutcome::ApplicationError { body, .. } => body,
            CallOutcome::TransportFailure => Value::Object(serde_json::Map::new()),
        }
    }
}

/// Best human-readable message for an error body: `error.title` when the
/// service sent a structured error, the raw `error` field otherwise, and
/// the whole body as a last resort.
pub fn error_message(body: &Value) -> String {
    match body.get("error") {
        Some(error) => match error.get("title").and_then(Value::as_str) {
            Some(title) => title.to_string(),
            None => render(error),
        },
        None => render(body),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
