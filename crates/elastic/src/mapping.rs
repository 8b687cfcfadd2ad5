//! Index mapping and settings definitions.
//!
//! A [`Mapping`] describes field types and analysis for an index. It is
//! translated to the `mappings` section of an index-creation body by
//! [`create_index_body`].

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

/// Primary shard count used by `create_index_with_mapping`.
pub const MAPPED_INDEX_SHARDS: u32 = 3;

/// Replica count used by `create_index_with_mapping`.
pub const MAPPED_INDEX_REPLICAS: u32 = 1;

/// Elasticsearch field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Keyword,
    SearchAsYouType,
    Completion,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    Date,
    Object,
    Nested,
}

impl FieldType {
    /// The type name used in the mapping JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Keyword => "keyword",
            FieldType::SearchAsYouType => "search_as_you_type",
            FieldType::Completion => "completion",
            FieldType::Integer => "integer",
            FieldType::Long => "long",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Object => "object",
            FieldType::Nested => "nested",
        }
    }
}

/// A single field in a mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    field_type: FieldType,
    analyzer: Option<String>,
    normalizer: Option<String>,
    format: Option<String>,
    index: Option<bool>,
    fields: BTreeMap<String, Property>,
    properties: BTreeMap<String, Property>,
}

impl Property {
    /// Creates a property of the given type.
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            analyzer: None,
            normalizer: None,
            format: None,
            index: None,
            fields: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn text() -> Self {
        Self::new(FieldType::Text)
    }

    pub fn keyword() -> Self {
        Self::new(FieldType::Keyword)
    }

    pub fn date() -> Self {
        Self::new(FieldType::Date)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn long() -> Self {
        Self::new(FieldType::Long)
    }

    pub fn double() -> Self {
        Self::new(FieldType::Double)
    }

    /// Sets the analyzer (text fields).
    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    /// Sets the normalizer (keyword fields).
    pub fn with_normalizer(mut self, normalizer: impl Into<String>) -> Self {
        self.normalizer = Some(normalizer.into());
        self
    }

    /// Sets the date format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Controls whether the field is indexed.
    pub fn indexed(mut self, index: bool) -> Self {
        self.index = Some(index);
        self
    }

    /// Adds a multi-field (e.g., a `keyword` sub-field on a `text` field).
    pub fn with_field(mut self, name: impl Into<String>, property: Property) -> Self {
        self.fields.insert(name.into(), property);
        self
    }

    /// Adds the common `.keyword` sub-field.
    pub fn with_keyword_subfield(self) -> Self {
        self.with_field("keyword", Property::keyword())
    }

    /// Adds a child property (object and nested fields).
    pub fn with_property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Returns the field type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Translates the property to mapping JSON.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!(self.field_type.as_str()));

        if let Some(ref analyzer) = self.analyzer {
            obj.insert("analyzer".to_string(), json!(analyzer));
        }
        if let Some(ref normalizer) = self.normalizer {
            obj.insert("normalizer".to_string(), json!(normalizer));
        }
        if let Some(ref format) = self.format {
            obj.insert("format".to_string(), json!(format));
        }
        if let Some(index) = self.index {
            obj.insert("index".to_string(), json!(index));
        }
        if !self.fields.is_empty() {
            obj.insert("fields".to_string(), properties_json(&self.fields));
        }
        if !self.properties.is_empty() {
            obj.insert("properties".to_string(), properties_json(&self.properties));
        }

        Value::Object(obj)
    }
}

/// The field mapping of an index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    dynamic: Option<bool>,
    properties: BTreeMap<String, Property>,
}

impl Mapping {
    /// Creates an empty explicit mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mapping that lets the cluster derive field types.
    pub fn dynamic() -> Self {
        Self {
            dynamic: Some(true),
            properties: BTreeMap::new(),
        }
    }

    /// Sets the dynamic-mapping flag.
    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = Some(dynamic);
        self
    }

    /// Adds a top-level field.
    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Returns a top-level field by name.
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Returns true if no fields and no dynamic flag are set.
    pub fn is_empty(&self) -> bool {
        self.dynamic.is_none() && self.properties.is_empty()
    }

    /// Translates the mapping to the `mappings` JSON object.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        if let Some(dynamic) = self.dynamic {
            obj.insert("dynamic".to_string(), json!(dynamic));
        }
        if !self.properties.is_empty() {
            obj.insert("properties".to_string(), properties_json(&self.properties));
        }
        Value::Object(obj)
    }
}

fn properties_json(properties: &BTreeMap<String, Property>) -> Value {
    Value::Object(
        properties
            .iter()
            .map(|(name, prop)| (name.clone(), prop.to_json()))
            .collect(),
    )
}

/// Shard and replica settings for index creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSettings {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
}

impl IndexSettings {
    /// The fixed settings applied to explicitly mapped indices.
    pub fn mapped_default() -> Self {
        Self {
            number_of_shards: MAPPED_INDEX_SHARDS,
            number_of_replicas: MAPPED_INDEX_REPLICAS,
        }
    }
}

/// Builds the body of an index-creation request.
pub fn create_index_body(mapping: &Mapping, settings: Option<&IndexSettings>) -> Value {
    let mut body = Map::new();

    if let Some(settings) = settings {
        body.insert(
            "settings".to_string(),
            json!({
                "number_of_shards": settings.number_of_shards,
                "number_of_replicas": settings.number_of_replicas,
            }),
        );
    }

    if !mapping.is_empty() {
        body.insert("mappings".to_string(), mapping.to_json());
    }

    Value::Object(body)
}
