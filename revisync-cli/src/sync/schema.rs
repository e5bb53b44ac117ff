//! Typed table schemas
//!
//! Table schemas arrive as JSON-schema documents. They are parsed once into a
//! [`SchemaNode`] tree so that reference extraction and row validation are
//! plain recursive walks over a closed set of node kinds.

use serde_json::Value;
use std::collections::BTreeSet;

/// Key marking a string field as a reference to another table's row id
pub const FOREIGN_KEY_MARKER: &str = "foreignKey";

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Object {
        properties: Vec<(String, SchemaNode)>,
    },
    Array {
        items: Box<SchemaNode>,
    },
    String {
        foreign_key: Option<String>,
    },
    Number,
    Integer,
    Boolean,
    /// `$ref` to a shared schema (files, row metadata, ...)
    Ref {
        reference: String,
    },
    /// Anything without a recognizable `type`
    Unknown,
}

impl SchemaNode {
    pub fn from_value(value: &Value) -> Self {
        if let Some(reference) = value.get("$ref").and_then(Value::as_str) {
            return Self::Ref {
                reference: reference.to_string(),
            };
        }

        match value.get("type").and_then(Value::as_str) {
            Some("object") => {
                let properties = value
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| {
                        props
                            .iter()
                            .map(|(name, node)| (name.clone(), Self::from_value(node)))
                            .collect()
                    })
                    .unwrap_or_default();
                Self::Object { properties }
            }
            Some("array") => Self::Array {
                items: Box::new(
                    value
                        .get("items")
                        .map(Self::from_value)
                        .unwrap_or(Self::Unknown),
                ),
            },
            Some("string") => Self::String {
                foreign_key: value
                    .get(FOREIGN_KEY_MARKER)
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .map(String::from),
            },
            Some("number") => Self::Number,
            Some("integer") => Self::Integer,
            Some("boolean") => Self::Boolean,
            _ => Self::Unknown,
        }
    }

    /// Visit every node depth-first together with its property path
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&[&'a str], &'a SchemaNode)) {
        let mut path = Vec::new();
        self.walk_inner(&mut path, visit);
    }

    fn walk_inner<'a>(
        &'a self,
        path: &mut Vec<&'a str>,
        visit: &mut impl FnMut(&[&'a str], &'a SchemaNode),
    ) {
        visit(path.as_slice(), self);
        match self {
            Self::Object { properties } => {
                for (name, child) in properties {
                    path.push(name);
                    child.walk_inner(path, visit);
                    path.pop();
                }
            }
            Self::Array { items } => {
                path.push("[]");
                items.walk_inner(path, visit);
                path.pop();
            }
            _ => {}
        }
    }

    /// Tables referenced anywhere in this tree
    pub fn foreign_keys(&self) -> BTreeSet<String> {
        let mut targets = BTreeSet::new();
        self.walk(&mut |_, node| {
            if let Self::String {
                foreign_key: Some(table),
            } = node
            {
                targets.insert(table.clone());
            }
        });
        targets
    }

    /// Structural check of a value against this node
    ///
    /// Only JSON types are checked; unknown nodes and refs accept anything.
    /// Object properties missing from the value are accepted, extra ones too.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Object { properties } => match value.as_object() {
                Some(map) => properties.iter().all(|(name, node)| match map.get(name) {
                    Some(v) => node.accepts(v),
                    None => true,
                }),
                None => false,
            },
            Self::Array { items } => match value.as_array() {
                Some(values) => values.iter().all(|v| items.accepts(v)),
                None => false,
            },
            Self::String { .. } => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Ref { .. } | Self::Unknown => true,
        }
    }
}

/// A table id with its parsed schema
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub table_id: String,
    pub schema: SchemaNode,
}

impl TableSchema {
    pub fn new(table_id: impl Into<String>, raw: &Value) -> Self {
        Self {
            table_id: table_id.into(),
            schema: SchemaNode::from_value(raw),
        }
    }

    pub fn foreign_keys(&self) -> BTreeSet<String> {
        self.schema.foreign_keys()
    }
}
