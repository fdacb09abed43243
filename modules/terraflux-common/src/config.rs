use std::env;

/// Default radius for point-in-space queries when the caller omits one.
pub const DEFAULT_RADIUS_KM: f64 = 25.0;

/// Hard cap on radius queries. Planetary-scale data, so wider than a
/// city-scale product would allow.
pub const MAX_RADIUS_KM: f64 = 500.0;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Web server
    pub api_host: String,
    pub api_port: u16,

    // NASA POWER endpoint backing the climate-data family. Overridable for
    // tests and mirrors.
    pub power_base_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if a var is malformed.
    pub fn from_env() -> Self {
        Self {
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("API_PORT must be a number"),
            power_base_url: env::var("POWER_BASE_URL")
                .unwrap_or_else(|_| "https://power.larc.nasa.gov".to_string()),
        }
    }
}
