use crate::error::{Error, Result};
use crate::fetcher::RequestFetcher;
use crate::model::{Record, WorkItem};
use async_trait::async_trait;
use serde_json::Value;

/// Turns one work item into one record.
#[async_trait]
pub trait RecordParser: Send + Sync {
    async fn parse(&self, item: &WorkItem) -> Result<Record>;
}

/// Fetches storefront details for a single app id.
pub struct StorefrontParser {
    fetcher: RequestFetcher,
    detail_url: String,
    id_field: String,
}

impl StorefrontParser {
    pub fn new(fetcher: RequestFetcher, detail_url: impl Into<String>, id_field: impl Into<String>) -> Self {
        Self {
            fetcher,
            detail_url: detail_url.into(),
            id_field: id_field.into(),
        }
    }

    /// Shapes a detail response. Anything but `success: true` with an object
    /// payload yields the placeholder record.
    pub fn shape(&self, item: &WorkItem, body: Value) -> Record {
        let entry = match body {
            Value::Object(mut map) => map.remove(&item.id.to_string()),
            _ => None,
        };

        if let Some(Value::Object(mut entry)) = entry {
            let success = entry.get("success").and_then(Value::as_bool).unwrap_or(false);
            if success {
                if let Some(Value::Object(data)) = entry.remove("data") {
                    return Record::new(data);
                }
            }
        }

        log::debug!("No storefront data for {} ({})", item.id, item.name);
        Record::placeholder(&self.id_field, item)
    }
}

#[async_trait]
impl RecordParser for StorefrontParser {
    async fn parse(&self, item: &WorkItem) -> Result<Record> {
        let params = [("appids", item.id.to_string())];
        let body = self.fetcher.fetch(&self.detail_url, &params).await?;
        Ok(self.shape(item, body))
    }
}

/// Fetches one page of the aggregator's "all apps" listing.
pub struct ListingParser {
    fetcher: RequestFetcher,
    listing_url: String,
}

impl ListingParser {
    pub fn new(fetcher: RequestFetcher, listing_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            listing_url: listing_url.into(),
        }
    }

    pub async fn fetch_page(&self, page: u32) -> Result<Vec<WorkItem>> {
        let params = [("request", "all".to_string()), ("page", page.to_string())];
        let body = self.fetcher.fetch(&self.listing_url, &params).await?;
        let items = decode_listing(body)?;
        log::info!("Page {} listed {} apps", page, items.len());
        Ok(items)
    }
}

/// Decodes a listing body (opaque key -> `{appid, name, ...}`) into work items
/// sorted by id. The sort is stable, so duplicate ids keep their listing order.
pub fn decode_listing(body: Value) -> Result<Vec<WorkItem>> {
    let map = match body {
        Value::Object(map) => map,
        other => {
            return Err(Error::Listing(format!(
                "expected an object keyed by app, got {}",
                kind_of(&other)
            )));
        }
    };

    let mut items = Vec::with_capacity(map.len());
    for (key, entry) in map {
        let Some(id) = entry.get("appid").and_then(as_app_id) else {
            log::warn!("Skipping listing entry {} without a numeric appid", key);
            continue;
        };
        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        items.push(WorkItem::new(id, name));
    }

    items.sort_by_key(|item| item.id);
    Ok(items)
}

fn as_app_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::RetryPolicy;
    use serde_json::json;

    fn parser() -> StorefrontParser {
        let fetcher = RequestFetcher::with_client(reqwest::Client::new(), RetryPolicy::immediate(Some(0)));
        StorefrontParser::new(fetcher, "http://localhost/api/appdetails/", "steam_appid")
    }

    #[test]
    fn listing_is_sorted_by_id() {
        let body = json!({
            "a": {"appid": 1, "name": "A"},
            "b": {"appid": 3, "name": "C"},
            "c": {"appid": 2, "name": "B"},
        });
        let items = decode_listing(body).unwrap();
        assert_eq!(
            items,
            vec![WorkItem::new(1, "A"), WorkItem::new(2, "B"), WorkItem::new(3, "C")]
        );
    }

    #[test]
    fn listing_sort_is_stable_for_duplicate_ids() {
        let body = json!({
            "k1": {"appid": 5, "name": "first"},
            "k2": {"appid": 4, "name": "other"},
            "k3": {"appid": 5, "name": "second"},
        });
        let items = decode_listing(body).unwrap();
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["other", "first", "second"]);
    }

    #[test]
    fn listing_skips_entries_without_appid() {
        let body = json!({
            "x": {"name": "no id"},
            "y": {"appid": "10", "name": "string id"},
            "z": {"appid": 7},
        });
        let items = decode_listing(body).unwrap();
        assert_eq!(items, vec![WorkItem::new(7, ""), WorkItem::new(10, "string id")]);
    }

    #[test]
    fn listing_rejects_non_object() {
        let err = decode_listing(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, Error::Listing(_)));
    }

    #[test]
    fn success_returns_payload_unmodified() {
        let data = json!({"name": "Half-Life", "steam_appid": 70, "is_free": false, "genres": [{"id": "1"}]});
        let body = json!({"70": {"success": true, "data": data.clone()}});
        let record = parser().shape(&WorkItem::new(70, "Half-Life"), body);
        assert_eq!(record.into_value(), data);
    }

    #[test]
    fn failure_returns_name_and_id_only() {
        let body = json!({"71": {"success": false}});
        let record = parser().shape(&WorkItem::new(71, "Gone"), body);
        assert_eq!(record.into_value(), json!({"name": "Gone", "steam_appid": 71}));
    }

    #[test]
    fn missing_entry_returns_placeholder() {
        let record = parser().shape(&WorkItem::new(72, "Other"), json!({"99": {"success": true, "data": {}}}));
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("steam_appid"), Some(&json!(72)));
    }
}
