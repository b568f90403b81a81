//! Conversion between index documents and Tantivy documents.

use serde_json::Value as JsonValue;
use tantivy::schema::Value;
use tantivy::TantivyDocument;

use reindex_types::{FieldKind, IndexDocument};

use crate::error::SearchError;
use crate::schema::{MappedField, ModelSchema};

/// A document as stored in a model index.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub version: u64,
    /// Canonical JSON of the mapped fields
    pub source: String,
}

impl StoredDocument {
    /// Read the bookkeeping fields back from a retrieved document.
    pub fn from_tantivy(schema: &ModelSchema, doc: &TantivyDocument) -> Option<Self> {
        let id = doc.get_first(schema.doc_id).and_then(|v| v.as_str())?;
        let version = doc
            .get_first(schema.doc_version)
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let source = doc
            .get_first(schema.doc_source)
            .and_then(|v| v.as_str())
            .unwrap_or("");

        Some(Self {
            id: id.to_string(),
            version,
            source: source.to_string(),
        })
    }
}

/// Build the Tantivy document for `doc` at `version`.
///
/// Fails with `SchemaMismatch` when a field is not mapped or a value does
/// not fit its field kind. Null values are skipped; arrays index each
/// element.
pub fn to_tantivy_doc(
    schema: &ModelSchema,
    doc: &IndexDocument,
    version: u64,
    source: &str,
) -> Result<TantivyDocument, SearchError> {
    if let Some(unknown) = doc.fields.keys().find(|name| schema.mapped(name).is_none()) {
        return Err(SearchError::SchemaMismatch(format!(
            "document '{}' has unmapped field '{}'",
            doc.id, unknown
        )));
    }

    let mut tantivy_doc = TantivyDocument::default();
    tantivy_doc.add_text(schema.doc_id, &doc.id);
    tantivy_doc.add_u64(schema.doc_version, version);
    tantivy_doc.add_text(schema.doc_source, source);

    for mapped in &schema.fields {
        match doc.fields.get(&mapped.spec.name) {
            None | Some(JsonValue::Null) => {}
            Some(JsonValue::Array(values)) => {
                for value in values {
                    add_value(&mut tantivy_doc, mapped, &doc.id, value)?;
                }
            }
            Some(value) => add_value(&mut tantivy_doc, mapped, &doc.id, value)?,
        }
    }

    Ok(tantivy_doc)
}

fn add_value(
    tantivy_doc: &mut TantivyDocument,
    mapped: &MappedField,
    doc_id: &str,
    value: &JsonValue,
) -> Result<(), SearchError> {
    match (mapped.spec.kind, value) {
        (FieldKind::Text | FieldKind::Keyword, JsonValue::String(s)) => {
            tantivy_doc.add_text(mapped.field, s);
        }
        (FieldKind::I64, JsonValue::Number(n)) if n.as_i64().is_some() => {
            tantivy_doc.add_i64(mapped.field, n.as_i64().unwrap_or_default());
        }
        (FieldKind::F64, JsonValue::Number(n)) if n.as_f64().is_some() => {
            tantivy_doc.add_f64(mapped.field, n.as_f64().unwrap_or_default());
        }
        (FieldKind::Bool, JsonValue::Bool(b)) => {
            tantivy_doc.add_bool(mapped.field, *b);
        }
        (kind, other) => {
            return Err(SearchError::SchemaMismatch(format!(
                "document '{}' field '{}' expects {}, got {}",
                doc_id, mapped.spec.name, kind, other
            )));
        }
    }
    Ok(())
}
