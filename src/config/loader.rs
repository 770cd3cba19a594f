use crate::config::schema::CrawlConfig;
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<CrawlConfig> {
        let path = path.as_ref();
        let mut visited = HashSet::new();
        let merged = Self::load_with_inheritance(path, &mut visited)?;

        let config: CrawlConfig = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a file and everything it `extends`, child keys winning. Tables
    /// (such as `retry`) are merged key by key.
    fn load_with_inheritance(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<Value> {
        let path = fs::canonicalize(path).map_err(|e| {
            Error::Config(format!("{}: {}", path.display(), e))
        })?;

        if visited.contains(&path) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }
        visited.insert(path.clone());

        let mut config = Self::load_file(&path)?;
        let Some(table) = config.as_object_mut() else {
            return Err(Error::Config(format!(
                "{}: top level must be a table",
                path.display()
            )));
        };

        let parent = match table.remove("extends") {
            Some(Value::String(parent_path_str)) => {
                let parent_path = path.parent()
                    .ok_or_else(|| Error::Config(format!(
                        "Cannot determine parent directory for {}",
                        path.display()
                    )))?
                    .join(parent_path_str);
                Some(Self::load_with_inheritance(&parent_path, visited)?)
            }
            Some(Value::Null) | None => None,
            Some(other) => {
                return Err(Error::Config(format!(
                    "{}: `extends` must be a path, got {}",
                    path.display(),
                    other
                )));
            }
        };

        Ok(match parent {
            Some(parent) => merge_values(parent, config),
            None => config,
        })
    }

    fn load_file(path: &Path) -> Result<Value> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }
}

fn merge_values(parent: Value, child: Value) -> Value {
    match (parent, child) {
        (Value::Object(mut parent), Value::Object(child)) => {
            for (key, value) in child {
                let merged = match parent.remove(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => value,
                };
                parent.insert(key, merged);
            }
            Value::Object(parent)
        }
        (_, child) => child,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn child_overrides_parent_and_tables_merge() {
        let parent = json!({"batch_size": 30, "retry": {"max_retries": 3, "backoff_factor": 2.0}});
        let child = json!({"pause_ms": 0, "retry": {"max_retries": 5}});
        assert_eq!(
            merge_values(parent, child),
            json!({"batch_size": 30, "pause_ms": 0, "retry": {"max_retries": 5, "backoff_factor": 2.0}})
        );
    }

    #[test]
    fn arrays_are_replaced_not_merged() {
        let merged = merge_values(json!({"columns": ["a", "b"]}), json!({"columns": ["c"]}));
        assert_eq!(merged, json!({"columns": ["c"]}));
    }
}
