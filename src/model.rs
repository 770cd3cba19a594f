use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One crawl target as listed by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    pub name: String,
}

impl WorkItem {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// The shaped output row for one [`WorkItem`].
///
/// Fields are whatever the upstream API returned; the table writers decide
/// which of them become columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// The sparse record used when the storefront has no data for an item.
    pub fn placeholder(id_field: &str, item: &WorkItem) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(item.name.clone()));
        fields.insert(id_field.to_string(), Value::from(item.id));
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}
