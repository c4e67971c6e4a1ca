// Client configuration with environment overrides

use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api/v1/hotels";

pub const DEFAULT_FEATURED_CITIES: &[&str] =
    &["Delhi", "Mumbai", "Jaipur", "Agra", "Goa", "Chennai", "Kolkata"];

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    // Transport timeout; unset means the HTTP client default
    pub timeout_ms: Option<u64>,
    pub featured_ttl_hours: i64,
    pub featured_cities: Vec<String>,
    pub image_pool_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: None,
            featured_ttl_hours: 24,
            featured_cities: DEFAULT_FEATURED_CITIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            image_pool_size: 4,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            base_url: var("HOTEL_API_BASE_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.base_url),
            timeout_ms: var("HOTEL_API_TIMEOUT_MS")
                .and_then(|raw| parse("HOTEL_API_TIMEOUT_MS", &raw)),
            featured_ttl_hours: try_load("FEATURED_TTL_HOURS", defaults.featured_ttl_hours),
            featured_cities: var("FEATURED_CITIES")
                .map(|raw| parse_cities(&raw))
                .filter(|cities| !cities.is_empty())
                .unwrap_or(defaults.featured_cities),
            image_pool_size: try_load("IMAGE_POOL_SIZE", defaults.image_pool_size)
                .max(1),
        }
    }
}

pub fn parse_cities(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().or_else(|| {
        info!("{key} not set, using default");
        None
    })
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Option<T>
where
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value {raw:?}: {e}");
        })
        .ok()
}

fn try_load<T: FromStr + Display>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    var(key)
        .and_then(|raw| parse(key, &raw))
        .unwrap_or_else(|| {
            info!("{key} falling back to {default}");
            default
        })
}
