use strum_macros::Display;

/// A dynamically-typed value as handed over by the host.
///
/// This only exists at the bridge boundary. Handlers convert it into proper
/// Rust types immediately and never pass it further in.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Host object, function or array. Its contents are not marshaled.
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Undefined,
    Null,
    Bool,
    Number,
    String,
    Object,
}

impl HostValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            HostValue::Undefined => ValueKind::Undefined,
            HostValue::Null => ValueKind::Null,
            HostValue::Bool(_) => ValueKind::Bool,
            HostValue::Number(_) => ValueKind::Number,
            HostValue::String(_) => ValueKind::String,
            HostValue::Object => ValueKind::Object,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render as JSON for hosts that speak JSON (the native stdin host).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            HostValue::Undefined | HostValue::Null | HostValue::Object => serde_json::Value::Null,
            HostValue::Bool(b) => serde_json::Value::Bool(*b),
            HostValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            HostValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::String(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::String(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Number(value)
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<serde_json::Value> for HostValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => HostValue::Null,
            serde_json::Value::Bool(b) => HostValue::Bool(b),
            // every JSON number fits an f64, possibly with rounding
            serde_json::Value::Number(n) => HostValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => HostValue::String(s),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => HostValue::Object,
        }
    }
}
