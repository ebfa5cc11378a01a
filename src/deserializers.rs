//! Custom deserializers for flexible request parsing.
//!
//! Web forms and scripts send the same field in different shapes; these keep
//! the request types strict while accepting the common variants.

use serde::{Deserialize, Deserializer};

/// Deserializes a free-text field that callers sometimes send as a number.
///
/// # Accepted Formats
///
/// * **String**: kept verbatim (`"2021"`, `" 2021 "`, `"soon"`)
/// * **Integer or float**: rendered with `to_string` (`2021` → `"2021"`)
/// * **Null**: empty string, so the later blank-field check reports it
///
/// # Examples
///
/// ```json
/// { "founded_year": "2021" }
/// { "founded_year": 2021 }
/// ```
pub fn de_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = serde_json::Value::deserialize(deserializer)?;
    match v {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Deserializes a flag that defaults to `true` when null, accepting booleans,
/// 0/1, and the strings "true"/"false"/"yes"/"no"/"1"/"0".
pub fn de_bool_default_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = serde_json::Value::deserialize(deserializer)?;
    match v {
        serde_json::Value::Null => Ok(true),
        serde_json::Value::Bool(b) => Ok(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(D::Error::custom(format!("invalid numeric flag: {}", n))),
        },
        serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" | "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            other => Err(D::Error::custom(format!("invalid flag value: '{}'", other))),
        },
        other => Err(D::Error::custom(format!("invalid type for flag: {}", other))),
    }
}

/// Serde default for opt-out flags.
pub fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "de_string_or_number")]
        year: String,
        #[serde(default = "default_true", deserialize_with = "de_bool_default_true")]
        flag: bool,
    }

    fn probe(json: &str) -> Result<Probe, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_year_shapes() {
        assert_eq!(probe(r#"{"year": 2021}"#).unwrap().year, "2021");
        assert_eq!(probe(r#"{"year": " 2021 "}"#).unwrap().year, " 2021 ");
        assert_eq!(probe(r#"{"year": null}"#).unwrap().year, "");
        assert_eq!(probe(r#"{}"#).unwrap().year, "");
        assert!(probe(r#"{"year": [2021]}"#).is_err());
    }

    #[test]
    fn test_flag_shapes() {
        assert!(probe(r#"{}"#).unwrap().flag);
        assert!(probe(r#"{"flag": null}"#).unwrap().flag);
        assert!(!probe(r#"{"flag": false}"#).unwrap().flag);
        assert!(!probe(r#"{"flag": "No"}"#).unwrap().flag);
        assert!(!probe(r#"{"flag": 0}"#).unwrap().flag);
        assert!(probe(r#"{"flag": "maybe"}"#).is_err());
    }
}
