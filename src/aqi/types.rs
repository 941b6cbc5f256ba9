use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// Upstream (WAQI feed) response. Apart from `status`, any field may be
// missing, null, or of an unexpected type; those read as absent.

#[derive(Debug, Clone, Deserialize)]
pub struct WaqiResponse {
    pub status: String,
    /// An object on success; the provider puts a message string here on error.
    #[serde(default)]
    pub data: Option<Value>,
}

/// Field that reads as `None` instead of failing when the upstream value is
/// null or does not match `T`.
#[derive(Debug, Clone)]
pub struct Lenient<T>(pub Option<T>);

impl<T> Lenient<T> {
    pub fn into_inner(self) -> Option<T> {
        self.0
    }
}

impl<T> Default for Lenient<T> {
    fn default() -> Self {
        Lenient(None)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Lenient<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Lenient(serde_json::from_value(value).ok()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WaqiData {
    pub aqi: Option<Value>,
    pub dominentpol: Lenient<String>,
    pub city: Lenient<WaqiCity>,
    pub time: Lenient<WaqiTime>,
    pub attributions: Lenient<Vec<Lenient<WaqiAttribution>>>,
    pub iaqi: Lenient<BTreeMap<String, Lenient<WaqiIaqi>>>,
    pub forecast: Lenient<WaqiForecast>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WaqiCity {
    pub name: Lenient<String>,
    pub url: Lenient<String>,
    pub geo: Lenient<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WaqiTime {
    pub s: Lenient<String>,
    pub iso: Lenient<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WaqiAttribution {
    pub name: Lenient<String>,
    pub url: Lenient<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WaqiIaqi {
    pub v: Option<Value>,
}

pub type WaqiDaily = BTreeMap<String, Lenient<Vec<Lenient<WaqiDailyValue>>>>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WaqiForecast {
    pub daily: Lenient<WaqiDaily>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WaqiDailyValue {
    pub day: Lenient<String>,
    pub avg: Option<Value>,
    pub min: Option<Value>,
    pub max: Option<Value>,
}

// Normalized summary served to the browser.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityAqiSummary {
    pub city: String,
    pub aqi: Option<i64>,
    pub dominant_pollutant: Option<String>,
    pub coordinates: Coordinates,
    pub updated_at: Option<String>,
    pub attribution: Vec<Attribution>,
    pub source_url: Option<String>,
    pub readings: Vec<PollutantReading>,
    pub forecast: Vec<DailyForecast>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantReading {
    pub pollutant: String,
    pub value: f64,
}

/// Missing `avg`, `min` or `max` values are NaN, which serializes as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct DailyForecast {
    pub pollutant: String,
    pub day: String,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl PartialEq for DailyForecast {
    fn eq(&self, other: &Self) -> bool {
        fn same(a: f64, b: f64) -> bool {
            (a.is_nan() && b.is_nan()) || a == b
        }

        self.pollutant == other.pollutant
            && self.day == other.day
            && same(self.avg, other.avg)
            && same(self.min, other.min)
            && same(self.max, other.max)
    }
}
