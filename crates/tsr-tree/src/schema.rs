//! Declarative settings schemas
//!
//! A [`Schema`] lists the fields a resource declares, each with its
//! configuration name, its remote wire name and its [`Kind`]. The merge
//! engine walks the schema instead of inspecting types at runtime.
//!
//! # Example
//!
//! ```rust
//! use tsr_tree::{FieldSpec, Kind, Schema};
//!
//! let search = Schema::new()
//!     .bool("disable_docs_search")
//!     .bool("disable_bing_video_search");
//! let root = Schema::new()
//!     .with_field(FieldSpec::new("disable_nps_comments_reachout", Kind::Bool)
//!         .with_wire("disableNPSCommentsReachout"))
//!     .object("search", search);
//!
//! assert_eq!(root.get("search").unwrap().wire(), "search");
//! assert!(root.by_wire("disableNPSCommentsReachout").is_some());
//! ```

use crate::field::Value;
use crate::path::FieldPath;

/// Declared shape of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Int,
    String,
    /// UUID carried as a string on the wire
    Identifier,
    Object(Schema),
    /// Records reported wholesale; items are not schema-checked
    List,
}

impl Kind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::String => "string",
            Self::Identifier => "identifier",
            Self::Object(_) => "object",
            Self::List => "list",
        }
    }

    /// Whether a value has this kind's shape
    #[must_use]
    pub fn admits(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Bool, Value::Bool(_))
                | (Self::Int, Value::Int(_))
                | (Self::String | Self::Identifier, Value::String(_))
                | (Self::Object(_), Value::Object(_))
                | (Self::List, Value::List(_))
        )
    }

    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&Schema> {
        match self {
            Self::Object(schema) => Some(schema),
            _ => None,
        }
    }
}

/// One declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    name: String,
    wire: String,
    wire_path: Option<FieldPath>,
    kind: Kind,
}

impl FieldSpec {
    /// Field whose wire name is the camelCase form of `name`
    #[must_use]
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        let name = name.into();
        let wire = camel_case(&name);
        Self {
            name,
            wire,
            wire_path: None,
            kind,
        }
    }

    /// Override the wire name
    #[inline]
    #[must_use]
    pub fn with_wire(mut self, wire: impl Into<String>) -> Self {
        self.wire = wire.into();
        self
    }

    /// Anchor the field at an absolute location in the wire document
    ///
    /// For settings the remote keeps outside the section the configuration
    /// groups them under. The last segment becomes the wire name.
    #[must_use]
    pub fn with_wire_path(mut self, path: FieldPath) -> Self {
        if let Some(last) = path.last() {
            self.wire = last.to_string();
        }
        self.wire_path = Some(path);
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn wire(&self) -> &str {
        &self.wire
    }

    /// Absolute wire location, when anchored
    #[inline]
    #[must_use]
    pub fn wire_path(&self) -> Option<&FieldPath> {
        self.wire_path.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &Kind {
        &self.kind
    }
}

/// Ordered list of declared fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    #[must_use]
    pub fn bool(self, name: &str) -> Self {
        self.with_field(FieldSpec::new(name, Kind::Bool))
    }

    #[must_use]
    pub fn int(self, name: &str) -> Self {
        self.with_field(FieldSpec::new(name, Kind::Int))
    }

    #[must_use]
    pub fn string(self, name: &str) -> Self {
        self.with_field(FieldSpec::new(name, Kind::String))
    }

    #[must_use]
    pub fn identifier(self, name: &str) -> Self {
        self.with_field(FieldSpec::new(name, Kind::Identifier))
    }

    #[must_use]
    pub fn list(self, name: &str) -> Self {
        self.with_field(FieldSpec::new(name, Kind::List))
    }

    #[must_use]
    pub fn object(self, name: &str, schema: Schema) -> Self {
        self.with_field(FieldSpec::new(name, Kind::Object(schema)))
    }

    /// Declared field by configuration name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    /// Declared field by wire name
    #[must_use]
    pub fn by_wire(&self, wire: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.wire == wire)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Declared field at a dotted path
    #[must_use]
    pub fn resolve(&self, path: &FieldPath) -> Option<&FieldSpec> {
        let (leaf, parents) = path.segments().split_last()?;
        let mut schema = self;
        for segment in parents {
            schema = schema.get(segment)?.kind.as_object()?;
        }
        schema.get(leaf)
    }

    /// Wire location of the field at a configuration path
    ///
    /// Anchored fields report their absolute location; every other field
    /// extends its parent's location with its wire name.
    #[must_use]
    pub fn wire_path_of(&self, path: &FieldPath) -> Option<FieldPath> {
        let mut schema = Some(self);
        let mut wire = FieldPath::root();
        for segment in path.segments() {
            let spec = schema?.get(segment)?;
            wire = match spec.wire_path() {
                Some(anchored) => anchored.clone(),
                None => wire.child(spec.wire()),
            };
            schema = spec.kind.as_object();
        }
        (!wire.is_root()).then_some(wire)
    }

    /// Paths of every non-object field, depth first
    #[must_use]
    pub fn leaf_paths(&self) -> Vec<(FieldPath, &FieldSpec)> {
        let mut out = Vec::new();
        self.collect_leaves(&FieldPath::root(), &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: &FieldPath, out: &mut Vec<(FieldPath, &'a FieldSpec)>) {
        for spec in &self.fields {
            let path = prefix.child(spec.name.clone());
            match &spec.kind {
                Kind::Object(inner) => inner.collect_leaves(&path, out),
                _ => out.push((path, spec)),
            }
        }
    }
}

/// `snake_case` to `camelCase`
#[must_use]
pub fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
