//! Structured edit commands and their all-or-nothing validation.

use crate::error::{Error, Result};
use crate::ident::ElementId;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Replace,
    InsertBefore,
    InsertAfter,
    Delete,
}

impl UpdateKind {
    pub const ALL: [UpdateKind; 4] = [
        UpdateKind::Replace,
        UpdateKind::InsertBefore,
        UpdateKind::InsertAfter,
        UpdateKind::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UpdateKind::Replace => "replace",
            UpdateKind::InsertBefore => "insert_before",
            UpdateKind::InsertAfter => "insert_after",
            UpdateKind::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn requires_content(self) -> bool {
        self != UpdateKind::Delete
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural edit, checked on construction ([`UpdateCommand::new`] or
/// [`validate`]) and read-only afterwards.
///
/// Serializes to the wire form `{"type", "target_element", "content"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateCommand {
    #[serde(rename = "type")]
    kind: UpdateKind,
    #[serde(rename = "target_element")]
    target: ElementId,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

impl UpdateCommand {
    pub fn new(kind: UpdateKind, target: impl Into<ElementId>, content: Option<&str>) -> Result<Self> {
        let target = target.into();
        if target.as_str().is_empty() {
            return Err(Error::InvalidCommand("'target_element' must not be empty".into()));
        }
        if kind.requires_content() && content.is_none() {
            return Err(Error::InvalidCommand(format!(
                "update type '{kind}' requires 'content' field"
            )));
        }
        Ok(Self {
            kind,
            target,
            content: content.filter(|_| kind.requires_content()).map(str::to_string),
        })
    }

    pub fn kind(&self) -> UpdateKind {
        self.kind
    }

    pub fn target(&self) -> &ElementId {
        &self.target
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Same command with different markup, used when identifiers are stamped
    /// into the content ahead of application.
    pub(crate) fn with_content(&self, content: String) -> Self {
        Self {
            kind: self.kind,
            target: self.target.clone(),
            content: Some(content),
        }
    }
}

/// Validates raw input (one record or an array of records) into an
/// ordered batch. A single bad record rejects the whole batch.
pub fn validate(raw: &Value) -> Result<Vec<UpdateCommand>> {
    match raw {
        Value::Object(_) => Ok(vec![validate_record(0, raw)?]),
        Value::Array(items) => validate_records(items),
        other => Err(Error::InvalidCommand(format!(
            "updates must be a JSON object or array, got {}",
            json_type(other)
        ))),
    }
}

pub fn validate_records(items: &[Value]) -> Result<Vec<UpdateCommand>> {
    items
        .iter()
        .enumerate()
        .map(|(i, v)| validate_record(i, v))
        .collect()
}

fn validate_record(index: usize, value: &Value) -> Result<UpdateCommand> {
    let invalid = |reason: String| Error::InvalidCommand(format!("update at index {index}: {reason}"));

    let Value::Object(record) = value else {
        return Err(invalid(format!("must be an object, got {}", json_type(value))));
    };

    let kind = field(record, "type", "kind").ok_or_else(|| invalid("missing 'type' field".into()))?;
    let kind = kind
        .as_str()
        .and_then(UpdateKind::parse)
        .ok_or_else(|| {
            let allowed: Vec<&str> = UpdateKind::ALL.iter().map(|k| k.as_str()).collect();
            invalid(format!("invalid update type {kind}; must be one of {allowed:?}"))
        })?;

    let target = field(record, "target_element", "target")
        .ok_or_else(|| invalid("missing 'target_element' field".into()))?;
    let target = match target.as_str() {
        Some(t) if !t.trim().is_empty() => t,
        _ => return Err(invalid("'target_element' must be a non-empty string".into())),
    };

    let content = match record.get("content") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.as_str()),
        Some(other) => {
            return Err(invalid(format!("'content' must be a string, got {}", json_type(other))))
        }
    };
    if kind.requires_content() && content.is_none() {
        return Err(invalid(format!("update type '{kind}' requires 'content' field")));
    }

    UpdateCommand::new(kind, target, content)
}

fn field<'a>(record: &'a Map<String, Value>, name: &str, alias: &str) -> Option<&'a Value> {
    record.get(name).or_else(|| record.get(alias))
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
