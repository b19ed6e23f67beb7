use indexmap::IndexMap;
use serde_json::json;

use crate::reach::{AttributeValue, Reach};

/// Name of the destination's auto-maintained row identifier. Always present
/// in the derived schema, independent of source content.
pub const OBJECTID_FIELD: &str = "objectid";

#[derive(Debug, thiserror::Error)]
pub enum SchemaInconsistency {
    #[error("no records to derive a schema from")]
    Empty,
    #[error(
        "reach {reach_id} attribute keys diverge from the first record \
         (missing: {missing:?}, unexpected: {unexpected:?})"
    )]
    DivergentKeys {
        reach_id: i64,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    #[error("field {field} holds both {first} and {second} values")]
    ConflictingTypes {
        field: String,
        first: &'static str,
        second: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    ObjectId,
    Integer,
    Double,
    String,
    Date,
}

impl FieldKind {
    fn of(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Null => None,
            AttributeValue::Integer(_) => Some(Self::Integer),
            AttributeValue::Double(_) => Some(Self::Double),
            AttributeValue::String(_) => Some(Self::String),
            AttributeValue::Date(_) => Some(Self::Date),
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::ObjectId => "esriFieldTypeOID",
            Self::Integer => "esriFieldTypeInteger",
            Self::Double => "esriFieldTypeDouble",
            Self::String => "esriFieldTypeString",
            Self::Date => "esriFieldTypeDate",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    pub editable: bool,
    /// Declared maximum length in characters; string fields only.
    pub length: Option<usize>,
}

impl FieldDef {
    fn object_id() -> Self {
        Self {
            name: OBJECTID_FIELD.to_owned(),
            kind: FieldKind::ObjectId,
            nullable: false,
            editable: false,
            length: None,
        }
    }

    pub fn to_wire(&self) -> serde_json::Value {
        let mut field = json!({
            "name": self.name,
            "type": self.kind.wire_name(),
            "alias": self.name,
            "nullable": self.nullable,
            "editable": self.editable,
        });
        if let Some(length) = self.length {
            field["length"] = json!(length);
        }
        field
    }
}

/// Field schema derived from a complete, fully materialized reach
/// collection. Derived exactly once per batch, before any upload: sizing
/// string fields from a partial collection would under-declare lengths and
/// truncate or reject later records.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSchema {
    pub fields: Vec<FieldDef>,
}

impl LayerSchema {
    pub fn derive(reaches: &[Reach]) -> Result<Self, SchemaInconsistency> {
        let first = reaches.first().ok_or(SchemaInconsistency::Empty)?;

        // Divergent key sets mean a non-conforming normalizer, not bad
        // data; fail the whole batch rather than skip records.
        for reach in &reaches[1..] {
            let missing = key_difference(first.attributes(), reach.attributes());
            let unexpected = key_difference(reach.attributes(), first.attributes());
            if !missing.is_empty() || !unexpected.is_empty() {
                return Err(SchemaInconsistency::DivergentKeys {
                    reach_id: reach.reach_id(),
                    missing,
                    unexpected,
                });
            }
        }

        let mut fields = Vec::with_capacity(first.attributes().len() + 1);
        for name in first.attributes().keys() {
            // The explicit row identifier below wins over any field the
            // source happens to publish under the same name.
            if name == OBJECTID_FIELD {
                continue;
            }
            let mut kind = None;
            let mut max_length = None;
            for reach in reaches {
                let value = &reach.attributes()[name.as_str()];
                let Some(observed) = FieldKind::of(value) else {
                    continue;
                };
                match kind {
                    None => kind = Some(observed),
                    Some(previous) if previous != observed => {
                        return Err(SchemaInconsistency::ConflictingTypes {
                            field: name.clone(),
                            first: kind_label(previous),
                            second: value.kind_name(),
                        });
                    }
                    Some(_) => {}
                }
                if let Some(s) = value.as_str() {
                    let length = s.chars().count();
                    max_length = Some(max_length.map_or(length, |max: usize| max.max(length)));
                }
            }
            // A field that is null in every record still keeps its column;
            // it types as a nullable string with no declared length.
            let kind = kind.unwrap_or(FieldKind::String);
            fields.push(FieldDef {
                name: name.clone(),
                kind,
                nullable: true,
                editable: true,
                length: max_length.map(bounded_length),
            });
        }
        fields.push(FieldDef::object_id());

        Ok(Self { fields })
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn wire_fields(&self) -> Vec<serde_json::Value> {
        self.fields.iter().map(FieldDef::to_wire).collect()
    }
}

/// `ceil(max_length * 1.1)`, never below 1, kept compatible with the
/// destination's existing layers. Computed in integers: the obvious float
/// rendition turns 20 * 1.1 into 22.000000000000004 and over-declares.
fn bounded_length(max_length: usize) -> usize {
    (max_length * 11).div_ceil(10).max(1)
}

fn key_difference(
    left: &IndexMap<String, AttributeValue>,
    right: &IndexMap<String, AttributeValue>,
) -> Vec<String> {
    left.keys()
        .filter(|key| !right.contains_key(key.as_str()))
        .cloned()
        .collect()
}

fn kind_label(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::ObjectId => "object id",
        FieldKind::Integer => "integer",
        FieldKind::Double => "double",
        FieldKind::String => "string",
        FieldKind::Date => "date",
    }
}
