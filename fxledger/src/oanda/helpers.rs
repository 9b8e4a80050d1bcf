use chrono::{DateTime, Utc};

// OANDA sends prices as strings. A price that does not parse is treated as missing,
// not as a failed response.
pub fn deserialize_optional_f64_from_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<&str> = serde::Deserialize::deserialize(deserializer)?;
    Ok(s.and_then(|s| s.parse::<f64>().ok()).filter(|price| price.is_finite()))
}

pub fn deserialize_datetime_from_string<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: &str = serde::Deserialize::deserialize(deserializer)?;

    // OANDA timestamps are in RFC3339 format: "2023-09-15T20:58:00.145575162Z"
    let datetime = chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| serde::de::Error::custom(format!("Failed to parse datetime: {}", e)))?;
    Ok(datetime.with_timezone(&Utc))
}
