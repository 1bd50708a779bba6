use std::net::IpAddr;
use std::time::Duration;

use ipnet::IpNet;

use crate::geo::GeoPoint;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub geofence: GeofenceConfig,
    pub ip_lookup: IpLookupConfig,
    pub id_max_attempts: u32,
    pub max_body_size: usize,
    pub trusted_proxies: Vec<IpNet>,
    pub cors: CorsConfig,
    pub rate_limit: u32,
    pub rate_limit_window_secs: u64,
    pub static_dir: String,
    pub log_level: String,
}

/// Service area and spoofing tolerances used by the validation pipeline.
#[derive(Debug, Clone)]
pub struct GeofenceConfig {
    pub center: GeoPoint,
    pub radius_km: f64,
    pub ip_mismatch_km: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            center: GeoPoint {
                latitude: 22.6023,
                longitude: 72.8205,
            },
            radius_km: 50.0,
            ip_mismatch_km: 200.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IpLookupConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub failure_policy: IpLookupFailurePolicy,
}

impl Default for IpLookupConfig {
    fn default() -> Self {
        Self {
            base_url: "http://ip-api.com/json".to_string(),
            timeout: Duration::from_secs(5),
            failure_policy: IpLookupFailurePolicy::FailClosed,
        }
    }
}

/// What to do when the IP lookup cannot produce a usable answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpLookupFailurePolicy {
    /// Abort the submission.
    FailClosed,
    /// Skip the IP checks and keep going.
    FailOpen,
}

#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    pub origins: Vec<String>,
    pub origin_patterns: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;

        let host: IpAddr = env_or("RAKTMAP_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid RAKTMAP_HOST: {e}"))?;

        // Hosting platforms hand us PORT
        let port_default = env_or("PORT", "3000");
        let port: u16 = env_or("RAKTMAP_PORT", &port_default)
            .parse()
            .map_err(|e| format!("Invalid RAKTMAP_PORT: {e}"))?;

        let defaults = GeofenceConfig::default();
        let center_lat = env_f64("RAKTMAP_CENTER_LAT", defaults.center.latitude)?;
        let center_lon = env_f64("RAKTMAP_CENTER_LON", defaults.center.longitude)?;
        let center = GeoPoint::new(center_lat, center_lon)
            .ok_or_else(|| "Invalid RAKTMAP_CENTER_LAT/RAKTMAP_CENTER_LON".to_string())?;
        let geofence = GeofenceConfig {
            center,
            radius_km: env_f64("RAKTMAP_RADIUS_KM", defaults.radius_km)?,
            ip_mismatch_km: env_f64("RAKTMAP_IP_MISMATCH_KM", defaults.ip_mismatch_km)?,
        };

        let lookup_defaults = IpLookupConfig::default();
        let timeout_secs: u64 = env_or("RAKTMAP_IP_LOOKUP_TIMEOUT_SECS", "5")
            .parse()
            .map_err(|e| format!("Invalid RAKTMAP_IP_LOOKUP_TIMEOUT_SECS: {e}"))?;
        let failure_policy = match env_or("RAKTMAP_IP_LOOKUP_POLICY", "fail-closed").as_str() {
            "fail-closed" => IpLookupFailurePolicy::FailClosed,
            "fail-open" => IpLookupFailurePolicy::FailOpen,
            other => return Err(format!("Invalid RAKTMAP_IP_LOOKUP_POLICY: {other}")),
        };
        let ip_lookup = IpLookupConfig {
            base_url: env_or("RAKTMAP_IP_LOOKUP_URL", &lookup_defaults.base_url),
            timeout: Duration::from_secs(timeout_secs),
            failure_policy,
        };

        let id_max_attempts: u32 = env_or("RAKTMAP_ID_MAX_ATTEMPTS", "10")
            .parse()
            .map_err(|e| format!("Invalid RAKTMAP_ID_MAX_ATTEMPTS: {e}"))?;
        if id_max_attempts == 0 {
            return Err("RAKTMAP_ID_MAX_ATTEMPTS must be at least 1".to_string());
        }

        let max_body_size: usize = env_or("RAKTMAP_MAX_BODY_SIZE", "65536")
            .parse()
            .map_err(|e| format!("Invalid RAKTMAP_MAX_BODY_SIZE: {e}"))?;

        let trusted_proxies: Vec<IpNet> = env_or("RAKTMAP_TRUSTED_PROXIES", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e| format!("Invalid RAKTMAP_TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cors = CorsConfig {
            origins: env_list(
                "RAKTMAP_CORS_ORIGINS",
                "http://localhost:3000,http://localhost:3001",
            ),
            origin_patterns: env_list(
                "RAKTMAP_CORS_ORIGIN_PATTERNS",
                r"^https://.*\.devtunnels\.ms$,^https://.*\.vercel\.app$,^https://.*\.onrender\.com$",
            ),
        };
        for pattern in &cors.origin_patterns {
            regex::Regex::new(pattern)
                .map_err(|e| format!("Invalid RAKTMAP_CORS_ORIGIN_PATTERNS entry '{pattern}': {e}"))?;
        }

        let rate_limit: u32 = env_or("RAKTMAP_RATE_LIMIT", "10")
            .parse()
            .map_err(|e| format!("Invalid RAKTMAP_RATE_LIMIT: {e}"))?;
        let rate_limit_window_secs: u64 = env_or("RAKTMAP_RATE_LIMIT_WINDOW_SECS", "60")
            .parse()
            .map_err(|e| format!("Invalid RAKTMAP_RATE_LIMIT_WINDOW_SECS: {e}"))?;

        let static_dir = env_or("RAKTMAP_STATIC_DIR", "public");
        let log_level = env_or("RAKTMAP_LOG_LEVEL", "info");

        Ok(Config {
            database_url,
            host,
            port,
            geofence,
            ip_lookup,
            id_max_attempts,
            max_body_size,
            trusted_proxies,
            cors,
            rate_limit,
            rate_limit_window_secs,
            static_dir,
            log_level,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_f64(key: &str, default: f64) -> Result<f64, String> {
    match std::env::var(key) {
        Ok(raw) => {
            let value: f64 = raw.parse().map_err(|e| format!("Invalid {key}: {e}"))?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(format!("Invalid {key}: must be a finite number"))
            }
        }
        Err(_) => Ok(default),
    }
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    env_or(key, default)
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
