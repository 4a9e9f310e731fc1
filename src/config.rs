use crate::store::UserRecord;
use anyhow::{ensure, Context, Result};

/// Longest accepted code lifetime: one day.
pub const MAX_OTP_TTL_SECS: i64 = 86_400;

/// The user seeded into the in-memory store at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub preferred_language: String,
}

impl DemoUser {
    pub fn to_record(&self) -> UserRecord {
        UserRecord::new(
            self.id.clone(),
            self.name.clone(),
            self.email.clone(),
            self.mobile.clone(),
            self.preferred_language.clone(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub allowed_origins: Vec<String>,

    // Verification channels
    pub email_languages: Vec<String>,
    pub mobile_languages: Vec<String>,

    // OTP
    pub otp_ttl_secs: i64,
    pub expose_otp_in_response: bool,

    // Seed data
    pub demo_user: DemoUser,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            // Server
            port: parse_var("PORT", 5000)?,
            allowed_origins: list_var(
                "ALLOWED_ORIGINS",
                "http://localhost:3000,https://multilang-app-iota.vercel.app",
            ),

            // Verification channels
            email_languages: list_var("EMAIL_LANGUAGES", "fr"),
            mobile_languages: list_var("MOBILE_LANGUAGES", "en,hi,es,pt,zh"),

            // OTP
            otp_ttl_secs: parse_var("OTP_TTL_SECONDS", 300)?,
            expose_otp_in_response: parse_var("EXPOSE_OTP_IN_RESPONSE", false)?,

            // Seed data
            demo_user: DemoUser {
                id: string_var("DEMO_USER_ID", "1"),
                name: string_var("DEMO_USER_NAME", "Demo User"),
                email: string_var("DEMO_USER_EMAIL", "demo@example.com"),
                mobile: string_var("DEMO_USER_MOBILE", "+911234567890"),
                preferred_language: string_var("DEMO_USER_LANGUAGE", "en"),
            },
        };

        ensure!(
            config.otp_ttl_secs > 0,
            "OTP_TTL_SECONDS must be positive, got {}",
            config.otp_ttl_secs
        );
        ensure!(
            config.otp_ttl_secs <= MAX_OTP_TTL_SECS,
            "OTP_TTL_SECONDS must be at most {}, got {}",
            MAX_OTP_TTL_SECS,
            config.otp_ttl_secs
        );
        ensure!(!config.demo_user.id.is_empty(), "DEMO_USER_ID must not be empty");

        Ok(config)
    }
}

fn string_var(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Comma-separated list; blank entries are dropped.
fn list_var(name: &str, default: &str) -> Vec<String> {
    string_var(name, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Unset means `default`; set but unparsable is an error.
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has invalid value '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "PORT",
        "ALLOWED_ORIGINS",
        "EMAIL_LANGUAGES",
        "MOBILE_LANGUAGES",
        "OTP_TTL_SECONDS",
        "EXPOSE_OTP_IN_RESPONSE",
        "DEMO_USER_ID",
        "DEMO_USER_NAME",
        "DEMO_USER_EMAIL",
        "DEMO_USER_MOBILE",
        "DEMO_USER_LANGUAGE",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();

        let config = Config::from_env().expect("Defaults should load");

        assert_eq!(config.port, 5000);
        assert_eq!(
            config.allowed_origins,
            vec![
                "http://localhost:3000".to_string(),
                "https://multilang-app-iota.vercel.app".to_string()
            ]
        );
        assert_eq!(config.email_languages, vec!["fr".to_string()]);
        assert_eq!(config.mobile_languages, vec!["en", "hi", "es", "pt", "zh"]);
        assert_eq!(config.otp_ttl_secs, 300);
        assert!(!config.expose_otp_in_response);
        assert_eq!(config.demo_user.id, "1");
        assert_eq!(config.demo_user.email, "demo@example.com");
        assert_eq!(config.demo_user.preferred_language, "en");

        let record = config.demo_user.to_record();
        assert_eq!(record.mobile, "+911234567890");
        assert!(record.challenge.is_none());
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        std::env::set_var("PORT", "8080");
        std::env::set_var("EMAIL_LANGUAGES", " fr , de ,");
        std::env::set_var("MOBILE_LANGUAGES", "");
        std::env::set_var("OTP_TTL_SECONDS", "60");
        std::env::set_var("EXPOSE_OTP_IN_RESPONSE", "true");
        std::env::set_var("DEMO_USER_LANGUAGE", "hi");

        let config = Config::from_env().expect("Overrides should load");
        clear_env();

        assert_eq!(config.port, 8080);
        assert_eq!(config.email_languages, vec!["fr", "de"]);
        assert!(config.mobile_languages.is_empty());
        assert_eq!(config.otp_ttl_secs, 60);
        assert!(config.expose_otp_in_response);
        assert_eq!(config.demo_user.preferred_language, "hi");
    }

    #[test]
    #[serial]
    fn test_invalid_port_is_error() {
        clear_env();
        std::env::set_var("PORT", "not-a-port");

        let result = Config::from_env();
        clear_env();

        let err = result.expect_err("Invalid port should fail");
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    #[serial]
    fn test_non_positive_ttl_is_error() {
        clear_env();
        std::env::set_var("OTP_TTL_SECONDS", "0");

        let result = Config::from_env();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_oversized_ttl_is_error() {
        clear_env();
        std::env::set_var("OTP_TTL_SECONDS", "9000000000000");

        let result = Config::from_env();
        clear_env();

        let err = result.expect_err("Oversized TTL should fail");
        assert!(err.to_string().contains("OTP_TTL_SECONDS"));
    }

    #[test]
    #[serial]
    fn test_ttl_upper_bound_is_inclusive() {
        clear_env();
        std::env::set_var("OTP_TTL_SECONDS", MAX_OTP_TTL_SECS.to_string());

        let result = Config::from_env();
        std::env::set_var("OTP_TTL_SECONDS", (MAX_OTP_TTL_SECS + 1).to_string());
        let over = Config::from_env();
        clear_env();

        assert_eq!(
            result.expect("One day should be accepted").otp_ttl_secs,
            MAX_OTP_TTL_SECS
        );
        assert!(over.is_err());
    }

    #[test]
    #[serial]
    fn test_invalid_bool_is_error() {
        clear_env();
        std::env::set_var("EXPOSE_OTP_IN_RESPONSE", "yes");

        let result = Config::from_env();
        clear_env();

        assert!(result.is_err());
    }
}
