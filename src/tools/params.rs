use serde::Deserialize;
use serde::de::{self, Deserializer};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Search query
    pub query: String,
    /// Maximum number of links to return
    #[serde(default, deserialize_with = "lenient_count")]
    pub max_results: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    /// URL of the page to read
    pub url: String,
    /// Maximum number of characters of body text
    #[serde(default, deserialize_with = "lenient_count")]
    pub max_length: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct WikipediaPageParams {
    /// Article title, or a full article URL
    pub title: String,
}

/// Models send integers as `3`, `3.0` or `"3"`; all mean 3.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            })
            .map(|v| Some(v as usize))
            .ok_or_else(|| de::Error::custom(format!("expected a non-negative count, got {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected a count, got {s:?}"))),
        Some(other) => Err(de::Error::custom(format!("expected a count, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn count_accepts_integer_float_and_string() {
        for raw in [json!(3), json!(3.0), json!("3")] {
            let params: SearchParams =
                serde_json::from_value(json!({"query": "q", "max_results": raw})).unwrap();
            assert_eq!(params.max_results, Some(3));
        }
    }

    #[test]
    fn fractional_count_is_rejected() {
        let result =
            serde_json::from_value::<SearchParams>(json!({"query": "q", "max_results": 3.7}));
        assert!(result.is_err());
    }

    #[test]
    fn count_is_optional() {
        let params: SearchParams = serde_json::from_value(json!({"query": "q"})).unwrap();
        assert_eq!(params.max_results, None);

        let params: SearchParams =
            serde_json::from_value(json!({"query": "q", "max_results": null})).unwrap();
        assert_eq!(params.max_results, None);
    }

    #[test]
    fn negative_or_non_numeric_count_is_rejected() {
        assert!(
            serde_json::from_value::<SearchParams>(json!({"query": "q", "max_results": -2}))
                .is_err()
        );
        assert!(
            serde_json::from_value::<SearchParams>(json!({"query": "q", "max_results": [1]}))
                .is_err()
        );
    }

    #[test]
    fn missing_required_field_is_rejected() {
        assert!(serde_json::from_value::<PageParams>(json!({})).is_err());
    }
}
