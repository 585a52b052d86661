//! Strict JSON schemas describing the structured output a stage expects.
//!
//! Every schema is a flat object whose fields are all required and which
//! forbids additional properties, matching what strict structured-output
//! providers accept.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

const MAX_NAME_LEN: usize = 64;

/// Result alias for schema construction.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while building an [`OutputSchema`].
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema name is empty, too long, or uses unsupported characters.
    #[error("invalid schema name `{name}`: {reason}")]
    InvalidName {
        /// Offending name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Two fields share a name.
    #[error("duplicate field `{field}` in schema `{schema}`")]
    DuplicateField {
        /// Schema being built.
        schema: String,
        /// Repeated field name.
        field: String,
    },

    /// The schema declares no fields.
    #[error("schema `{schema}` declares no fields")]
    Empty {
        /// Schema being built.
        schema: String,
    },
}

/// JSON type of a single schema field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free-form string.
    String,
    /// Any JSON number.
    Number,
    /// Integral JSON number.
    Integer,
    /// `true` / `false`.
    Boolean,
    /// Array of strings.
    StringArray,
    /// String restricted to the listed values.
    StringEnum(Vec<String>),
}

/// One named field of an [`OutputSchema`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    name: String,
    kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl SchemaField {
    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field type.
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    fn to_json(&self) -> Value {
        let mut property = match &self.kind {
            FieldKind::String => json!({ "type": "string" }),
            FieldKind::Number => json!({ "type": "number" }),
            FieldKind::Integer => json!({ "type": "integer" }),
            FieldKind::Boolean => json!({ "type": "boolean" }),
            FieldKind::StringArray => json!({ "type": "array", "items": { "type": "string" } }),
            FieldKind::StringEnum(values) => json!({ "type": "string", "enum": values }),
        };
        if let (Some(description), Value::Object(map)) = (&self.description, &mut property) {
            map.insert("description".to_owned(), Value::from(description.clone()));
        }
        property
    }
}

/// Named, strict object schema requested from the completion service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSchema {
    name: String,
    fields: Vec<SchemaField>,
}

impl OutputSchema {
    /// Starts building a schema with the given name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> OutputSchemaBuilder {
        OutputSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Returns the schema name sent to the provider.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Renders the JSON-Schema document for this output.
    #[must_use]
    pub fn json_schema(&self) -> Value {
        let properties = self
            .fields
            .iter()
            .map(|field| (field.name.clone(), field.to_json()))
            .collect::<Map<_, _>>();
        let required = self
            .fields
            .iter()
            .map(|field| Value::from(field.name.clone()))
            .collect::<Vec<_>>();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

/// Builder for [`OutputSchema`].
#[derive(Debug)]
pub struct OutputSchemaBuilder {
    name: String,
    fields: Vec<SchemaField>,
}

impl OutputSchemaBuilder {
    /// Adds a required field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(SchemaField {
            name: name.into(),
            kind,
            description: None,
        });
        self
    }

    /// Adds a required field with a description shown to the model.
    #[must_use]
    pub fn described_field(
        mut self,
        name: impl Into<String>,
        kind: FieldKind,
        description: impl Into<String>,
    ) -> Self {
        self.fields.push(SchemaField {
            name: name.into(),
            kind,
            description: Some(description.into()),
        });
        self
    }

    /// Validates and builds the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] for invalid names, duplicate fields, or an
    /// empty field list.
    pub fn build(self) -> SchemaResult<OutputSchema> {
        validate_name(&self.name)?;
        if self.fields.is_empty() {
            return Err(SchemaError::Empty { schema: self.name });
        }
        for (index, field) in self.fields.iter().enumerate() {
            if self.fields[..index].iter().any(|prior| prior.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
        Ok(OutputSchema {
            name: self.name,
            fields: self.fields,
        })
    }
}

fn validate_name(name: &str) -> SchemaResult<()> {
    let reason = if name.is_empty() {
        Some("name cannot be empty")
    } else if name.len() > MAX_NAME_LEN {
        Some("name must be at most 64 characters")
    } else if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
    {
        Some("name must contain only ASCII letters, digits, underscore, or dash")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SchemaError::InvalidName {
            name: name.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_strict_object_schema() {
        let schema = OutputSchema::builder("validation_response")
            .field("valid", FieldKind::Boolean)
            .field("reason", FieldKind::String)
            .build()
            .unwrap();

        let doc = schema.json_schema();
        assert_eq!(doc["type"], "object");
        assert_eq!(doc["additionalProperties"], false);
        assert_eq!(doc["properties"]["valid"]["type"], "boolean");
        assert_eq!(doc["required"], json!(["valid", "reason"]));
    }

    #[test]
    fn enum_and_array_fields_render_items() {
        let schema = OutputSchema::builder("info_request_extraction")
            .described_field(
                "query_type",
                FieldKind::StringEnum(vec!["list_events".into(), "general_info".into()]),
                "Type of information request",
            )
            .field("events_mentioned", FieldKind::StringArray)
            .build()
            .unwrap();

        let doc = schema.json_schema();
        assert_eq!(doc["properties"]["query_type"]["enum"][1], "general_info");
        assert_eq!(
            doc["properties"]["query_type"]["description"],
            "Type of information request"
        );
        assert_eq!(doc["properties"]["events_mentioned"]["items"]["type"], "string");
    }

    #[test]
    fn rejects_duplicate_fields() {
        let err = OutputSchema::builder("registration_extraction")
            .field("name", FieldKind::String)
            .field("name", FieldKind::String)
            .build()
            .expect_err("duplicate");
        assert!(matches!(err, SchemaError::DuplicateField { field, .. } if field == "name"));
    }

    #[test]
    fn rejects_bad_names_and_empty_schemas() {
        assert!(matches!(
            OutputSchema::builder("has space")
                .field("a", FieldKind::String)
                .build(),
            Err(SchemaError::InvalidName { .. })
        ));
        assert!(matches!(
            OutputSchema::builder("empty").build(),
            Err(SchemaError::Empty { .. })
        ));
    }
}
