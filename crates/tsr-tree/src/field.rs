//! Field states and values
//!
//! A settings field is never just "optional": the caller may omit it, clear
//! it, leave it pending, or give it a value, and each of those means
//! something different to reconciliation.

use crate::tree::SettingsTree;

/// A concrete setting value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    String(String),
    /// Nested section
    Object(SettingsTree),
    /// List of records, always reported wholesale
    List(Vec<SettingsTree>),
}

impl Value {
    /// Short name of the value's shape, used in mismatch reports
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::Object(_) => "object",
            Self::List(_) => "list",
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&SettingsTree> {
        match self {
            Self::Object(tree) => Some(tree),
            _ => None,
        }
    }
}

/// State of one named field
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field {
    /// Not mentioned; the caller has no opinion
    #[default]
    Absent,
    /// Explicitly null; the caller wants it cleared
    Null,
    /// Pending computation by the orchestrator
    Unknown,
    Known(Value),
}

impl Field {
    #[inline]
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[inline]
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Present in configuration: either null or a known value
    #[inline]
    #[must_use]
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Null | Self::Known(_))
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Known(value) => Some(value),
            _ => None,
        }
    }

    /// Nested section, if this field holds one
    #[inline]
    #[must_use]
    pub fn object(&self) -> Option<&SettingsTree> {
        self.value().and_then(Value::as_object)
    }

    /// Shape name for reports: the value kind, or the state name
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Null => "null",
            Self::Unknown => "unknown",
            Self::Known(value) => value.kind_name(),
        }
    }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        Self::Known(value)
    }
}

impl From<bool> for Field {
    fn from(b: bool) -> Self {
        Self::Known(Value::Bool(b))
    }
}

impl From<i64> for Field {
    fn from(i: i64) -> Self {
        Self::Known(Value::Int(i))
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Self::Known(Value::String(s.to_string()))
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Self::Known(Value::String(s))
    }
}

impl From<SettingsTree> for Field {
    fn from(tree: SettingsTree) -> Self {
        Self::Known(Value::Object(tree))
    }
}

impl From<Vec<SettingsTree>> for Field {
    fn from(items: Vec<SettingsTree>) -> Self {
        Self::Known(Value::List(items))
    }
}
