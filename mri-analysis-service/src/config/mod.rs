use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Environment variable holding the Gemini credential.
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_TIMEOUT_SECONDS: u64 = 120;

/// The external model's free tier tolerates roughly one request every few seconds.
const DEFAULT_MIN_INTERVAL_MS: u64 = 3_000;

/// Default upload cap (20MB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
    pub analysis: AnalysisSettings,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Secret<String>,
    pub model: String,
    pub api_base: String,
    pub timeout_seconds: u64,
    /// Name of the variable `/health` inspects to report whether the credential
    /// is configured.
    pub credential_env: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Minimum gap between two consecutive calls to the external model.
    pub min_interval_ms: u64,
    pub max_upload_bytes: usize,
}

impl AnalysisConfig {
    pub fn load() -> Result<Self, AppError> {
        // Loads .env as a side effect, so it must run before any get_env call.
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(AnalysisConfig {
            common: common_config,
            gemini: GeminiSettings {
                api_key: required_secret(GEMINI_API_KEY_VAR, is_prod)?,
                model: get_env("GEMINI_MODEL", Some(DEFAULT_GEMINI_MODEL), is_prod)?,
                api_base: get_env("GEMINI_API_BASE", Some(DEFAULT_GEMINI_API_BASE), is_prod)?,
                timeout_seconds: parse_env(
                    "GEMINI_TIMEOUT_SECONDS",
                    DEFAULT_GEMINI_TIMEOUT_SECONDS,
                    is_prod,
                )?,
                credential_env: GEMINI_API_KEY_VAR.to_string(),
            },
            analysis: AnalysisSettings {
                min_interval_ms: parse_env(
                    "ANALYSIS_MIN_INTERVAL_MS",
                    DEFAULT_MIN_INTERVAL_MS,
                    is_prod,
                )?,
                max_upload_bytes: parse_env(
                    "ANALYSIS_MAX_UPLOAD_BYTES",
                    DEFAULT_MAX_UPLOAD_BYTES,
                    is_prod,
                )?,
            },
        })
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.analysis.min_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini.timeout_seconds)
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

/// Like `get_env` without a default, but a blank value counts as unset.
fn required_secret(key: &str, is_prod: bool) -> Result<Secret<String>, AppError> {
    let value = get_env(key, None, is_prod)?;
    if value.trim().is_empty() {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "{} is set but empty",
            key
        )));
    }
    Ok(Secret::new(value))
}

fn parse_env<T>(key: &str, default: T, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr + ToString,
    T::Err: std::fmt::Display,
{
    let raw = get_env(key, Some(&default.to_string()), is_prod)?;
    raw.trim().parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn get_env_falls_back_to_default_outside_prod() {
        let value = get_env("MRI_CONFIG_TEST_UNSET_A", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");
    }

    #[test]
    fn get_env_requires_value_without_default() {
        let err = get_env("MRI_CONFIG_TEST_UNSET_B", None, false).unwrap_err();
        assert!(err.to_string().contains("MRI_CONFIG_TEST_UNSET_B is required"));
    }

    #[test]
    fn get_env_ignores_defaults_in_prod() {
        let err = get_env("MRI_CONFIG_TEST_UNSET_C", Some("fallback"), true).unwrap_err();
        assert!(err.to_string().contains("required in production"));
    }

    #[test]
    fn required_secret_rejects_whitespace() {
        env::set_var("MRI_CONFIG_TEST_BLANK_SECRET", "   ");
        let err = required_secret("MRI_CONFIG_TEST_BLANK_SECRET", false).unwrap_err();
        assert!(err.to_string().contains("set but empty"));
    }

    #[test]
    fn required_secret_accepts_value() {
        env::set_var("MRI_CONFIG_TEST_SECRET", "key-123");
        let secret = required_secret("MRI_CONFIG_TEST_SECRET", false).unwrap();
        assert_eq!(secret.expose_secret(), "key-123");
    }

    // The only test in this binary that touches GEMINI_API_KEY.
    #[test]
    fn load_refuses_empty_api_key() {
        env::set_var(GEMINI_API_KEY_VAR, "");
        let err = AnalysisConfig::load().unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains(GEMINI_API_KEY_VAR));
    }

    #[test]
    fn parse_env_uses_typed_default() {
        let value: u64 = parse_env("MRI_CONFIG_TEST_UNSET_D", 3_000, false).unwrap();
        assert_eq!(value, 3_000);
    }

    #[test]
    fn parse_env_rejects_garbage() {
        env::set_var("MRI_CONFIG_TEST_GARBAGE", "three seconds");
        let err = parse_env::<u64>("MRI_CONFIG_TEST_GARBAGE", 3_000, false).unwrap_err();
        assert!(err.to_string().contains("invalid value"));
    }
}
