use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue};

use crate::oanda::errors::ApiStatusError;
use crate::oanda::objects::{Candle, CandlesResponse, OandaSettings};

pub type ApiResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub fn candles_endpoint(
    instrument: &str,
    granularity: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    settings: &OandaSettings,
) -> String {
    let from = from.to_rfc3339_opts(SecondsFormat::Secs, true);
    let to = to.to_rfc3339_opts(SecondsFormat::Secs, true);

    // The account-scoped route is used when an account is configured
    let prefix = if settings.account_id.is_empty() {
        format!("/v3/instruments/{}", instrument)
    } else {
        format!("/v3/accounts/{}/instruments/{}", settings.account_id, instrument)
    };

    format!(
        "{}{}/candles?price=M&granularity={}&from={}&to={}",
        settings.api_url, prefix, granularity, from, to
    )
}

// Midpoint candles for an instrument between `from` and `to`.
pub async fn get_candles(
    client: &reqwest::Client,
    instrument: &str,
    granularity: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    settings: &OandaSettings,
) -> ApiResult<Vec<Candle>> {
    let authorization = format!("Bearer {}", &settings.authorization);
    let url = candles_endpoint(instrument, granularity, from, to, settings);

    let mut headers = HeaderMap::new();
    headers.insert(
        "Authorization",
        HeaderValue::from_str(authorization.as_str())?,
    );
    headers.insert("Content-Type", HeaderValue::from_static("application/json"));

    log::trace!("GET {}", url);
    let response = client.get(&url).headers(headers).send().await?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(Box::new(ApiStatusError {
            status: status.as_u16(),
            message,
        }));
    }

    let body = response.text().await?;
    let parsed = serde_json::from_str::<CandlesResponse>(&body).map_err(|err| {
        log::debug!("Unparseable candles response for {}: {}", instrument, body);
        err
    })?;
    log::trace!(
        "Received {} {} candles for {}",
        parsed.candles.len(),
        parsed.granularity,
        parsed.instrument
    );

    Ok(parsed.candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn builds_candles_url() {
        let settings = OandaSettings::default();
        let from = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).unwrap();
        let url = candles_endpoint("EUR_USD", "D", from, to, &settings);
        assert_eq!(
            url,
            "https://api-fxpractice.oanda.com/v3/instruments/EUR_USD/candles?price=M&granularity=D&from=2024-03-04T12:00:00Z&to=2024-03-06T12:00:00Z"
        );

        let settings = OandaSettings { account_id: "101-001".to_string(), ..OandaSettings::default() };
        assert!(candles_endpoint("EUR_USD", "H1", from, to, &settings).contains("/v3/accounts/101-001/instruments/EUR_USD/candles"));
    }

    #[test]
    fn parses_candles_with_missing_or_bad_closes() {
        let body = r#"{
            "instrument": "EUR_USD",
            "granularity": "D",
            "candles": [
                {"complete": true, "volume": 10, "time": "2024-03-04T22:00:00.000000000Z", "mid": {"o": "1.0850", "c": "1.08570"}},
                {"complete": true, "volume": 10, "time": "2024-03-05T22:00:00.000000000Z", "mid": {"o": "1.0857", "c": "NaN"}},
                {"complete": false, "volume": 3, "time": "2024-03-06T22:00:00.000000000Z"}
            ]
        }"#;
        let parsed: CandlesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.candles.len(), 3);
        assert_eq!(parsed.candles[0].close(), Some(1.0857));
        assert_eq!(parsed.candles[1].close(), None);
        assert_eq!(parsed.candles[2].close(), None);
        assert!(!parsed.candles[2].complete);
    }

    #[test]
    fn forming_candle_has_no_settled_close() {
        let body = r#"{
            "instrument": "EUR_USD",
            "granularity": "D",
            "candles": [
                {"complete": true, "time": "2024-03-04T22:00:00.000000000Z", "mid": {"c": "1.08570"}},
                {"complete": false, "time": "2024-03-05T22:00:00.000000000Z", "mid": {"c": "1.09120"}}
            ]
        }"#;
        let parsed: CandlesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.candles[0].settled_close(), Some(1.0857));
        assert_eq!(parsed.candles[1].close(), Some(1.0912));
        assert_eq!(parsed.candles[1].settled_close(), None);
    }
}
