use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One JSON object from a registry or flag configuration file.
pub type ConfigObject = Map<String, Value>;

/// Load a JSON file holding either an array of objects or a single object.
///
/// A bare object is wrapped into a one-element sequence so callers always
/// see the same shape.
pub fn load_config(path: &Path) -> Result<Vec<ConfigObject>> {
    let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    match serde_json::from_str::<Vec<ConfigObject>>(&content) {
        Ok(configs) => Ok(configs),
        Err(_) => serde_json::from_str::<ConfigObject>(&content)
            .map(|single| vec![single])
            .map_err(|e| Error::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
    }
}

/// Walk a nested mapping one key per level and return the terminal string.
pub fn resolve_path(map: &ConfigObject, keys: &[String]) -> Result<String> {
    let not_found = |reason: String| Error::NotFound {
        keys: keys.to_vec(),
        reason,
    };

    let (last, parents) = keys
        .split_last()
        .ok_or_else(|| not_found("no keys to search".to_string()))?;

    let mut current = map;
    for key in parents {
        current = match current.get(key) {
            Some(Value::Object(nested)) => nested,
            Some(_) => return Err(not_found(format!("value for '{}' is not a map", key))),
            None => return Err(not_found(format!("key '{}' not found", key))),
        };
    }

    match current.get(last) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(not_found(format!("value for '{}' is not a string", last))),
        None => Err(not_found(format!("key '{}' not found", last))),
    }
}

/// Look up a file path in the registry file, trying each top-level object in order.
pub fn search_file_names(registry_file: &Path, keys: &[String]) -> Result<PathBuf> {
    let configs = load_config(registry_file)?;

    let mut last_reason = format!("{} holds no mappings", registry_file.display());
    for config in &configs {
        match resolve_path(config, keys) {
            Ok(found) => return Ok(PathBuf::from(found)),
            Err(Error::NotFound { reason, .. }) => last_reason = reason,
            Err(other) => return Err(other),
        }
    }

    Err(Error::NotFound {
        keys: keys.to_vec(),
        reason: last_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    fn object(value: Value) -> ConfigObject {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_resolve_nested_path() {
        let map = object(json!({"A": {"B": "x"}}));
        assert_eq!(resolve_path(&map, &keys(&["A", "B"])).unwrap(), "x");
    }

    #[test]
    fn test_resolve_missing_key() {
        let map = object(json!({"A": {"C": "x"}}));
        let err = resolve_path(&map, &keys(&["A", "B"])).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_resolve_rejects_non_string_and_non_map() {
        let map = object(json!({"A": {"B": 3}, "S": "leaf"}));
        assert!(matches!(
            resolve_path(&map, &keys(&["A", "B"])),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            resolve_path(&map, &keys(&["S", "B"])),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(resolve_path(&map, &[]), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_load_bare_object_is_wrapped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("single.json");
        fs::write(&path, r#"{"k":1}"#).unwrap();

        let configs = load_config(&path).unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0]["k"], json!(1));
    }

    #[test]
    fn test_load_array_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("many.json");
        fs::write(&path, r#"[{"k":1},{"k":2}]"#).unwrap();

        let configs = load_config(&path).unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[1]["k"], json!(2));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "[1, 2").unwrap();

        assert!(matches!(load_config(&path), Err(Error::Parse { .. })));
        assert!(matches!(
            load_config(&dir.path().join("absent.json")),
            Err(Error::ConfigRead { .. })
        ));
    }

    #[test]
    fn test_search_tries_every_mapping() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("filenames.json");
        fs::write(
            &path,
            r#"[{"Web": {"config": "web.json"}}, {"Nmap": {"config": "Nmap/config.json"}}]"#,
        )
        .unwrap();

        let found = search_file_names(&path, &keys(&["Nmap", "config"])).unwrap();
        assert_eq!(found, PathBuf::from("Nmap/config.json"));

        let err = search_file_names(&path, &keys(&["Ssh", "config"])).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
