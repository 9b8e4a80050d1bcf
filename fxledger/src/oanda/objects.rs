use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::oanda::helpers::{deserialize_datetime_from_string, deserialize_optional_f64_from_string};

pub const API_URL: &str = "https://api-fxpractice.oanda.com";

fn default_api_url() -> String {
    API_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OandaSettings {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub authorization: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for OandaSettings {
    fn default() -> Self {
        OandaSettings {
            account_id: String::new(),
            authorization: String::new(),
            api_url: default_api_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CandlesResponse {
    pub instrument: String,
    pub granularity: String,
    pub candles: Vec<Candle>,
}

#[derive(Debug, Deserialize)]
pub struct Candle {
    #[serde(deserialize_with = "deserialize_datetime_from_string")]
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub complete: bool,
    // Only present when midpoint prices were requested (price=M)
    pub mid: Option<CandleMid>,
}

#[derive(Debug, Deserialize)]
pub struct CandleMid {
    #[serde(default, deserialize_with = "deserialize_optional_f64_from_string")]
    #[serde(rename = "c")]
    pub close: Option<f64>,
}

impl Candle {
    pub fn close(&self) -> Option<f64> {
        self.mid.as_ref().and_then(|mid| mid.close)
    }

    // A candle that is still forming carries the live price, not a close.
    pub fn settled_close(&self) -> Option<f64> {
        if self.complete {
            self.close()
        } else {
            None
        }
    }
}
