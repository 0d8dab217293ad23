use std::time::Duration;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Base URL of the NASA POWER API (without `/temporal/...`).
    pub power_api_url: String,
    /// Base URL of the PVGIS API, including the version segment.
    pub pvgis_api_url: String,
    /// Timeout applied to every outbound provider call.
    pub http_timeout: Duration,
    /// First year of the irradiance climatology window.
    pub irradiance_start_year: u16,
    /// Last year of the irradiance climatology window.
    pub irradiance_end_year: u16,
    /// System size used when neither a roof polygon nor `system_kw` is given.
    pub default_system_kw: f64,
    pub user_agent: String,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let timeout_secs: u64 = env_or("HTTP_TIMEOUT_SECS", "15")
            .parse()
            .expect("HTTP_TIMEOUT_SECS must be a whole number of seconds");
        let default_system_kw: f64 = env_or("DEFAULT_SYSTEM_KW", "3.0")
            .parse()
            .expect("DEFAULT_SYSTEM_KW must be a number");
        assert!(
            default_system_kw.is_finite() && default_system_kw > 0.0,
            "DEFAULT_SYSTEM_KW must be positive"
        );

        let irradiance_start_year: u16 = env_or("IRRADIANCE_START_YEAR", "2001")
            .parse()
            .expect("IRRADIANCE_START_YEAR must be a year");
        let irradiance_end_year: u16 = env_or("IRRADIANCE_END_YEAR", "2020")
            .parse()
            .expect("IRRADIANCE_END_YEAR must be a year");
        assert!(
            irradiance_start_year <= irradiance_end_year,
            "IRRADIANCE_START_YEAR must not be after IRRADIANCE_END_YEAR"
        );

        Self {
            port: env_or("PORT", "8080")
                .parse()
                .expect("PORT must be a valid u16"),
            power_api_url: env_or("POWER_API_URL", "https://power.larc.nasa.gov/api"),
            pvgis_api_url: env_or("PVGIS_API_URL", "https://re.jrc.ec.europa.eu/api/v5_2"),
            http_timeout: Duration::from_secs(timeout_secs),
            irradiance_start_year,
            irradiance_end_year,
            default_system_kw,
            user_agent: env_or("USER_AGENT", "SolarEstimate/0.1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        // NOTE: set_var/remove_var in tests is unsafe in multi-threaded contexts.
        // This is the only test in the crate touching these variables.
        unsafe {
            for name in [
                "PORT",
                "POWER_API_URL",
                "PVGIS_API_URL",
                "HTTP_TIMEOUT_SECS",
                "IRRADIANCE_START_YEAR",
                "IRRADIANCE_END_YEAR",
                "DEFAULT_SYSTEM_KW",
                "USER_AGENT",
            ] {
                std::env::remove_var(name);
            }
        }

        let config = AppConfig::from_env();

        assert_eq!(config.port, 8080);
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert_eq!(config.irradiance_start_year, 2001);
        assert_eq!(config.irradiance_end_year, 2020);
        assert_eq!(config.default_system_kw, 3.0);
        assert!(config.pvgis_api_url.ends_with("v5_2"));
        assert!(config.power_api_url.contains("power.larc.nasa.gov"));
        assert!(config.user_agent.contains("SolarEstimate"));
    }
}
