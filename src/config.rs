use std::env;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_AQI_API_BASE: &str = "https://api.waqi.info/feed";
const DEFAULT_AQI_API_TOKEN: &str = "demo";
const DEFAULT_CACHE_MAX_ENTRIES: usize = 100;
const DEFAULT_CACHE_TTL_MINUTES: f64 = 10.0;
const DEFAULT_PUBLIC_DIR: &str = "public";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub aqi_api_base: String,
    /// `None` when the token variable is set but blank.
    pub aqi_api_token: Option<String>,
    pub cache_max_entries: NonZeroUsize,
    pub cache_ttl: Duration,
    pub public_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source. Unparseable
    /// or non-positive numbers fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_positive::<u16, _>(&lookup, "PORT").unwrap_or(DEFAULT_PORT);

        let cache_max_entries = NonZeroUsize::new(
            parse_positive::<usize, _>(&lookup, "CACHE_MAX_ENTRIES")
                .unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
        )
        .unwrap_or(NonZeroUsize::MIN);

        let cache_ttl = parse_positive::<f64, _>(&lookup, "CACHE_TTL_MINUTES")
            .and_then(minutes_to_duration)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_CACHE_TTL_MINUTES * 60.0));

        let aqi_api_token = match lookup("AQI_API_TOKEN") {
            Some(token) if token.trim().is_empty() => None,
            Some(token) => Some(token.trim().to_string()),
            None => Some(DEFAULT_AQI_API_TOKEN.to_string()),
        };

        Config {
            port,
            aqi_api_base: lookup("AQI_API_BASE")
                .filter(|base| !base.trim().is_empty())
                .map(|base| base.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_AQI_API_BASE.to_string()),
            aqi_api_token,
            cache_max_entries,
            cache_ttl,
            public_dir: lookup("PUBLIC_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PUBLIC_DIR)),
        }
    }
}

fn minutes_to_duration(minutes: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(minutes * 60.0).ok()
}

fn parse_positive<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Some(value),
        _ => {
            tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
            None
        }
    }
}
