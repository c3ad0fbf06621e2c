//! Typed server configuration, read from the process environment after
//! [`crate::load_and_apply`] has merged XDG + `.env` into it.

use std::path::PathBuf;

use crate::LoadError;

/// Server-wide configuration for the chat backend.
///
/// All fields are read from environment variables. A variable that is present but
/// cannot be parsed is an error (`LoadError::InvalidValue`) rather than a silent
/// fallback to the default, so a typo in `APPROVAL_TIMEOUT_SECS` surfaces at startup
/// instead of silently picking 600.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub listen_addr: String,
    pub db_path: PathBuf,
    pub resource_dir: PathBuf,
    pub env: String,
    pub approval_timeout_secs: u64,
    pub provider_timeout_secs: u64,
    pub tool_loop_limit: u32,
}

impl AppConfig {
    /// Builds an `AppConfig` from the current process environment.
    ///
    /// `app_name` is used only to compute the default `db_path`
    /// (`./data/<app_name>.db`); it has no effect once `DB_PATH` is set explicitly.
    pub fn from_env(app_name: &str) -> Result<Self, LoadError> {
        let listen_addr = env_or("LISTEN_ADDR", ":8080");
        let db_path = env_or("DB_PATH", &format!("./data/{app_name}.db")).into();
        let resource_dir = env_or("RESOURCE_DIR", "./data/resources/").into();
        let env = env_or("ENV", "prod");
        let approval_timeout_secs = env_parse("APPROVAL_TIMEOUT_SECS", 600)?;
        let provider_timeout_secs = env_parse("PROVIDER_TIMEOUT_SECS", 300)?;
        let tool_loop_limit = env_parse("TOOL_LOOP_LIMIT", 16)?;

        Ok(AppConfig {
            listen_addr,
            db_path,
            resource_dir,
            env,
            approval_timeout_secs,
            provider_timeout_secs,
            tool_loop_limit,
        })
    }

    /// `true` when `ENV=dev` — loosens CORS and raises the default log level.
    pub fn is_dev(&self) -> bool {
        self.env == "dev"
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T, LoadError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| LoadError::InvalidValue(key.to_string(), e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // AppConfig::from_env reads process-wide state; serialize tests that touch it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_keys() {
        for key in [
            "LISTEN_ADDR",
            "DB_PATH",
            "RESOURCE_DIR",
            "ENV",
            "APPROVAL_TIMEOUT_SECS",
            "PROVIDER_TIMEOUT_SECS",
            "TOOL_LOOP_LIMIT",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn defaults_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_keys();
        let cfg = AppConfig::from_env("chatcore").unwrap();
        assert_eq!(cfg.listen_addr, ":8080");
        assert_eq!(cfg.db_path, PathBuf::from("./data/chatcore.db"));
        assert_eq!(cfg.resource_dir, PathBuf::from("./data/resources/"));
        assert_eq!(cfg.env, "prod");
        assert_eq!(cfg.approval_timeout_secs, 600);
        assert_eq!(cfg.provider_timeout_secs, 300);
        assert_eq!(cfg.tool_loop_limit, 16);
        assert!(!cfg.is_dev());
    }

    #[test]
    fn overrides_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_keys();
        env::set_var("LISTEN_ADDR", "0.0.0.0:9090");
        env::set_var("ENV", "dev");
        env::set_var("APPROVAL_TIMEOUT_SECS", "30");
        env::set_var("TOOL_LOOP_LIMIT", "4");

        let cfg = AppConfig::from_env("chatcore").unwrap();

        assert_eq!(cfg.listen_addr, "0.0.0.0:9090");
        assert_eq!(cfg.approval_timeout_secs, 30);
        assert_eq!(cfg.tool_loop_limit, 4);
        assert!(cfg.is_dev());
        clear_keys();
    }

    #[test]
    fn invalid_numeric_value_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_keys();
        env::set_var("APPROVAL_TIMEOUT_SECS", "not-a-number");
        let result = AppConfig::from_env("chatcore");
        clear_keys();
        assert!(matches!(result, Err(LoadError::InvalidValue(key, _)) if key == "APPROVAL_TIMEOUT_SECS"));
    }
}
