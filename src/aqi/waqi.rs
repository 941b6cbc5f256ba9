use super::types::*;
use super::AqiCache;
use crate::config::Config;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(7);

#[derive(Error, Debug)]
pub enum AqiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Upstream(String),
}

/// Client for the WAQI city feed, memoized through an owned [`AqiCache`].
pub struct WaqiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    cache: AqiCache,
}

impl WaqiClient {
    pub fn new(config: &Config, cache: AqiCache) -> reqwest::Result<Self> {
        Self::with_endpoint(
            config.aqi_api_base.clone(),
            config.aqi_api_token.clone(),
            UPSTREAM_TIMEOUT,
            cache,
        )
    }

    pub fn with_endpoint(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
        cache: AqiCache,
    ) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent("AqiProxyServer/1.0")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token,
            timeout,
            cache,
        })
    }

    pub fn cache(&self) -> &AqiCache {
        &self.cache
    }

    /// Fetch the normalized AQI summary for `city`, serving from cache when
    /// possible. Makes at most one upstream request and never retries.
    pub async fn fetch_city_aqi(&self, city: &str) -> Result<CityAqiSummary, AqiError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(AqiError::InvalidInput("City must be provided.".to_string()));
        }

        if let Some(cached) = self.cache.get(city) {
            tracing::debug!("AQI cache hit for {:?}", city);
            return Ok(cached);
        }
        tracing::debug!("AQI cache miss for {:?}", city);

        let token = self.token.as_deref().ok_or_else(|| {
            AqiError::Configuration("AQI_API_TOKEN is not configured.".to_string())
        })?;

        let data = match self.fetch_upstream(city, token).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Upstream AQI lookup for {:?} failed: {}", city, e);
                return Err(e);
            }
        };

        let summary = CityAqiSummary::from_waqi(data, city);
        self.cache.set(city, summary.clone());
        tracing::debug!("Cached AQI for {:?} ({} entries)", city, self.cache.len());
        Ok(summary)
    }

    async fn fetch_upstream(&self, city: &str, token: &str) -> Result<WaqiData, AqiError> {
        let url = format!("{}/{}/", self.base_url, urlencoding::encode(city));
        tracing::info!("Fetching AQI for {:?} from upstream", city);

        let response = self
            .client
            .get(&url)
            .query(&[("token", token)])
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AqiError::Upstream(format!("HTTP {}: {}", status, error_text)));
        }

        let body: WaqiResponse = response.json().await.map_err(|e| self.request_error(e))?;
        extract_data(body)
    }

    fn request_error(&self, err: reqwest::Error) -> AqiError {
        if err.is_timeout() {
            AqiError::Upstream(format!("Upstream request timed out after {:?}", self.timeout))
        } else if err.is_decode() {
            AqiError::Upstream(format!("Upstream returned an unreadable response: {}", err))
        } else {
            AqiError::Upstream(format!("Upstream request failed: {}", err))
        }
    }
}

fn extract_data(body: WaqiResponse) -> Result<WaqiData, AqiError> {
    if body.status != "ok" {
        let message = match body.data {
            Some(Value::String(message)) => message,
            _ => "Upstream API responded with an error.".to_string(),
        };
        return Err(AqiError::Upstream(message));
    }

    match body.data {
        Some(Value::String(message)) => Err(AqiError::Upstream(message)),
        Some(data @ Value::Object(_)) => serde_json::from_value(data).map_err(|e| {
            AqiError::Upstream(format!("Upstream returned an unreadable response: {}", e))
        }),
        _ => Err(AqiError::Upstream(
            "Upstream response did not include any data.".to_string(),
        )),
    }
}

// Convert WAQI data to the normalized summary
impl CityAqiSummary {
    pub fn from_waqi(data: WaqiData, fallback_city: &str) -> Self {
        let city = data.city.into_inner().unwrap_or_default();
        let time = data.time.into_inner().unwrap_or_default();
        let geo = city.geo.into_inner().unwrap_or_default();

        let mut readings: Vec<PollutantReading> = data
            .iaqi
            .into_inner()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(pollutant, reading)| {
                let value = reading.into_inner()?.v.as_ref().and_then(Value::as_f64)?;
                Some(PollutantReading { pollutant, value })
            })
            .collect();
        readings.sort_by(|a, b| b.value.total_cmp(&a.value));

        let attribution = data
            .attributions
            .into_inner()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|attrib| {
                let attrib = attrib.into_inner()?;
                match (attrib.name.into_inner(), attrib.url.into_inner()) {
                    (Some(name), Some(url)) if !name.is_empty() && !url.is_empty() => {
                        Some(Attribution { name, url })
                    }
                    _ => None,
                }
            })
            .collect();

        Self {
            city: city
                .name
                .into_inner()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| fallback_city.to_string()),
            aqi: data.aqi.as_ref().and_then(number_as_i64),
            dominant_pollutant: data.dominentpol.into_inner(),
            coordinates: Coordinates {
                lat: geo.first().and_then(Value::as_f64),
                lon: geo.get(1).and_then(Value::as_f64),
            },
            updated_at: time.iso.into_inner().or(time.s.into_inner()),
            attribution,
            source_url: city.url.into_inner(),
            readings,
            forecast: flatten_forecast(
                data.forecast
                    .into_inner()
                    .and_then(|forecast| forecast.daily.into_inner()),
            ),
        }
    }
}

fn flatten_forecast(daily: Option<WaqiDaily>) -> Vec<DailyForecast> {
    let Some(daily) = daily else {
        return Vec::new();
    };

    let mut forecast: Vec<DailyForecast> = daily
        .into_iter()
        .flat_map(|(pollutant, values)| {
            let values = values.into_inner().unwrap_or_default();
            values.into_iter().filter_map(move |value| {
                let value = value.into_inner()?;
                let day = value.day.into_inner().filter(|day| !day.is_empty())?;
                Some(DailyForecast {
                    pollutant: pollutant.clone(),
                    day,
                    avg: number_or_nan(value.avg.as_ref()),
                    min: number_or_nan(value.min.as_ref()),
                    max: number_or_nan(value.max.as_ref()),
                })
            })
        })
        .collect();

    forecast.sort_by(|a, b| a.day.cmp(&b.day));
    forecast
}

fn number_as_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|v| v.round() as i64))
}

fn number_or_nan(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(f64::NAN)
}
