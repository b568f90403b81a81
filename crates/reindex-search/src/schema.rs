//! Tantivy schema derived from a model mapping.
//!
//! Every model index carries three bookkeeping fields:
//! - doc_id: STRING | STORED - document identity, used for upserts
//! - doc_version: u64 STORED - bumped only when the source changes
//! - doc_source: STORED - canonical JSON of the mapped fields
//!
//! followed by one typed field per mapped field.

use tantivy::schema::{Field, Schema, INDEXED, STORED, STRING, TEXT};

use reindex_types::{FieldKind, FieldSpec, Mapping};

use crate::SearchError;

pub const DOC_ID_FIELD: &str = "doc_id";
pub const DOC_VERSION_FIELD: &str = "doc_version";
pub const DOC_SOURCE_FIELD: &str = "doc_source";

/// A mapped field and its Tantivy handle.
#[derive(Debug, Clone)]
pub struct MappedField {
    pub spec: FieldSpec,
    pub field: Field,
}

/// Schema field handles for one model index
#[derive(Debug, Clone)]
pub struct ModelSchema {
    schema: Schema,
    pub doc_id: Field,
    pub doc_version: Field,
    pub doc_source: Field,
    pub fields: Vec<MappedField>,
}

impl ModelSchema {
    /// Get the underlying Tantivy schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Look up the handle of a mapped field.
    pub fn mapped(&self, name: &str) -> Option<&MappedField> {
        self.fields.iter().find(|f| f.spec.name == name)
    }

    /// Rebuild handles from an opened index, checking it matches the mapping.
    pub fn from_schema(schema: Schema, mapping: &Mapping) -> Result<Self, SearchError> {
        let lookup = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| SearchError::SchemaMismatch(format!("missing {} field", name)))
        };

        let doc_id = lookup(DOC_ID_FIELD)?;
        let doc_version = lookup(DOC_VERSION_FIELD)?;
        let doc_source = lookup(DOC_SOURCE_FIELD)?;

        let mut fields = Vec::with_capacity(mapping.fields.len());
        for spec in &mapping.fields {
            fields.push(MappedField {
                spec: spec.clone(),
                field: lookup(&spec.name)?,
            });
        }

        Ok(Self {
            schema,
            doc_id,
            doc_version,
            doc_source,
            fields,
        })
    }
}

/// Build the Tantivy schema for a mapping.
pub fn build_model_schema(mapping: &Mapping) -> ModelSchema {
    let mut schema_builder = Schema::builder();

    let doc_id = schema_builder.add_text_field(DOC_ID_FIELD, STRING | STORED);
    let doc_version = schema_builder.add_u64_field(DOC_VERSION_FIELD, STORED);
    let doc_source = schema_builder.add_text_field(DOC_SOURCE_FIELD, STORED);

    let fields = mapping
        .fields
        .iter()
        .map(|spec| {
            let field = match spec.kind {
                FieldKind::Text => schema_builder.add_text_field(&spec.name, TEXT | STORED),
                FieldKind::Keyword => schema_builder.add_text_field(&spec.name, STRING | STORED),
                FieldKind::I64 => schema_builder.add_i64_field(&spec.name, INDEXED | STORED),
                FieldKind::F64 => schema_builder.add_f64_field(&spec.name, INDEXED | STORED),
                FieldKind::Bool => schema_builder.add_bool_field(&spec.name, INDEXED | STORED),
            };
            MappedField {
                spec: spec.clone(),
                field,
            }
        })
        .collect();

    ModelSchema {
        schema: schema_builder.build(),
        doc_id,
        doc_version,
        doc_source,
        fields,
    }
}
