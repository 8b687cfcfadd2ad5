//! Document model.
//!
//! Every model stored through a repository implements [`Document`]. The
//! index a type lives in is a deterministic function of the type: by default
//! the lower-cased, unqualified type name.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mapping::Mapping;

/// An entity that can be stored in its own index.
///
/// ```
/// use helios_elastic::Document;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Product {
///     id: String,
///     name: String,
/// }
///
/// impl Document for Product {
///     fn id(&self) -> String {
///         self.id.clone()
///     }
/// }
///
/// assert_eq!(Product::index_name(), "product");
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The document identifier.
    fn id(&self) -> String;

    /// The index this type is stored in.
    fn index_name() -> String {
        default_index_name::<Self>()
    }

    /// The mapping used when the repository creates the index.
    ///
    /// Defaults to dynamic mapping, letting the cluster derive field types
    /// from the first documents indexed.
    fn mapping() -> Mapping {
        Mapping::dynamic()
    }
}

/// Returns the lower-cased, unqualified name of `T` with generic
/// arguments stripped (`app::models::Order<u32>` becomes `order`).
pub fn default_index_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_lowercase()
}

/// A schemaless JSON document whose id is read from its `id` field.
///
/// Useful for tools that operate on arbitrary indices; bind the repository
/// to an explicit index with `ElasticsearchRepository::with_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonDocument(pub Value);

impl JsonDocument {
    /// Returns the wrapped JSON value.
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl Document for JsonDocument {
    fn id(&self) -> String {
        match self.0.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize)]
    struct CustomerOrder {
        id: String,
    }

    impl Document for CustomerOrder {
        fn id(&self) -> String {
            self.id.clone()
        }
    }

    #[derive(Serialize, Deserialize)]
    struct Renamed {
        id: u64,
    }

    impl Document for Renamed {
        fn id(&self) -> String {
            self.id.to_string()
        }

        fn index_name() -> String {
            "legacy-orders".to_string()
        }
    }

    #[allow(dead_code)]
    struct Wrapper<T>(T);

    #[test]
    fn test_default_index_name() {
        assert_eq!(CustomerOrder::index_name(), "customerorder");
        assert_eq!(default_index_name::<Wrapper<CustomerOrder>>(), "wrapper");
    }

    #[test]
    fn test_index_name_override() {
        assert_eq!(Renamed::index_name(), "legacy-orders");
        assert_eq!(Renamed { id: 9 }.id(), "9");
    }

    #[test]
    fn test_json_document_id() {
        let doc = JsonDocument(serde_json::json!({"id": "abc", "name": "x"}));
        assert_eq!(doc.id(), "abc");

        let doc = JsonDocument(serde_json::json!({"id": 17}));
        assert_eq!(doc.id(), "17");

        let doc = JsonDocument(serde_json::json!({"name": "no id"}));
        assert_eq!(doc.id(), "");
    }

    #[test]
    fn test_default_mapping_is_dynamic() {
        let mapping = CustomerOrder::mapping();
        assert_eq!(mapping.to_json()["dynamic"], true);
    }
}
