pub mod types;
pub mod waqi;

use crate::cache::TtlLruCache;
use crate::config::Config;
use types::CityAqiSummary;

pub type AqiCache = TtlLruCache<CityAqiSummary>;

pub fn init_cache(config: &Config) -> AqiCache {
    TtlLruCache::new(config.cache_max_entries, config.cache_ttl)
}
