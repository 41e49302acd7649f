//! Config key validation with "did you mean?" suggestions.
//!
//! Two-pass parse: the raw TOML is first read into a `toml::Value` tree and
//! every dotted key path is compared against the known layout of
//! [`ProjectConfig`](super::ProjectConfig). Unknown keys become warnings;
//! they never break loading.

use std::collections::HashSet;

/// A non-fatal config warning.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

/// Largest edit distance still offered as a suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Every valid dotted key path in a project config file.
///
/// Kept in step with the structs in `project_config.rs`.
pub fn known_config_keys() -> HashSet<&'static str> {
    [
        "project",
        "project.name",
        "project.api_project_id",
        "api",
        "api.base_url",
        "api.timeout_secs",
        "mqtt",
        "mqtt.broker_host",
        "mqtt.broker_port",
        "mqtt.topic",
        "gnss",
        "gnss.max_distance_m",
        "gnss.registry_ttl_secs",
        "upload",
        "upload.interval_secs",
        "upload.sensor_id",
        "upload.endpoint",
    ]
    .into_iter()
    .collect()
}

/// Recursively collect dotted key paths from a TOML tree.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let Some(table) = value.as_table() else {
        return Vec::new();
    };
    let mut keys = Vec::with_capacity(table.len());
    for (k, v) in table {
        let path = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        if v.is_table() {
            keys.extend(walk_toml_keys(v, &path));
        }
        keys.push(path);
    }
    keys
}

/// Levenshtein edit distance over chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = (above + 1)
                .min(row[j] + 1)
                .min(diag + usize::from(ca != *cb));
            diag = above;
        }
    }

    row[b.len()]
}

/// Closest known key within [`MAX_SUGGESTION_DISTANCE`] edits, if any.
///
/// Ties resolve to the lexicographically smallest key so the suggestion is
/// stable across runs.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (edit_distance(unknown, k), *k))
        .filter(|(d, _)| *d <= MAX_SUGGESTION_DISTANCE)
        .min()
        .map(|(_, k)| k.to_string())
}

/// Parse raw TOML and return a warning for each unknown key.
///
/// Malformed TOML yields no warnings here; serde reports it afterwards.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    let mut found = walk_toml_keys(&value, "");
    found.sort();

    found
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("gnss", "gnss"), 0);
    }

    #[test]
    fn test_typo_gets_suggestion() {
        let warnings = validate_unknown_keys("[gnss]\nmax_distnce_m = 5.0\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "gnss.max_distnce_m");
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("gnss.max_distance_m")
        );
    }

    #[test]
    fn test_unrelated_key_has_no_suggestion() {
        let warnings = validate_unknown_keys("[telemetry]\nflavour = \"x\"\n");
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.suggestion.is_none()));
    }

    #[test]
    fn test_known_keys_produce_no_warnings() {
        let toml_str = r#"
[project]
name = "Quang Ninh"
api_project_id = 3

[api]
base_url = "https://holes.example/api"
timeout_secs = 5

[mqtt]
broker_host = "10.0.0.2"
broker_port = 8883
topic = "device/+/upload"

[gnss]
max_distance_m = 8.0
registry_ttl_secs = 60

[upload]
interval_secs = 2
sensor_id = "LASER_SENSOR"
endpoint = "depth"
"#;
        assert!(validate_unknown_keys(toml_str).is_empty());
    }

    #[test]
    fn test_malformed_toml_is_left_to_serde() {
        assert!(validate_unknown_keys("[gnss\nmax = ").is_empty());
    }
}
