//! JSON configuration file.
//!
//! Values are addressed by dotted keys (`email.smtp_server`). Login secrets may
//! also come from the environment (or a `.env` file): `NEU_USERNAME` and
//! `NEU_PASSWORD` take precedence over `auth.username` / `auth.password`.
//!
//! ```json
//! {
//!   "auth": { "username": "20210001", "password": "..." },
//!   "output": { "directory": "output", "grades_filename": "grades.csv" },
//!   "neu_login": { "service_url": "http://219.216.96.4/eams/homeExt.action", "bypass_proxy": false },
//!   "service_data": { "plan_id": "4068" },
//!   "auto": { "check_interval": 3600 },
//!   "email": { "smtp_server": "smtp.example.com", "smtp_port": 587, "...": "..." }
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::domain::Credentials;
use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";

const ENV_USERNAME: &str = "NEU_USERNAME";
const ENV_PASSWORD: &str = "NEU_PASSWORD";

#[derive(Debug, Clone, Default)]
pub struct Config {
    data: Value,
}

impl Config {
    /// Load `path`. A missing or malformed file is a configuration error.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::config(format!(
                "Failed to open config '{}': {e}. Create it (see README) or pass --config.",
                path.display()
            ))
        })?;
        let data: Value = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| AppError::config(format!("Invalid config JSON '{}': {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(Self { data })
    }

    pub fn from_value(data: Value) -> Self {
        Self { data }
    }

    /// Value at a dotted key, if every segment exists.
    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.').try_fold(&self.data, |node, segment| node.get(segment))
    }

    /// Non-empty string at `key`. Numbers are accepted and rendered as text.
    pub fn get_opt_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str, default: &str) -> String {
        self.get_opt_str(key).unwrap_or_else(|| default.to_string())
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => true,
                "false" | "no" | "0" => false,
                _ => default,
            },
            _ => default,
        }
    }

    pub fn get_opt_u64(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.get_opt_u64(key).unwrap_or(default)
    }

    /// Login secret from the environment or the config file.
    pub fn credentials(&self) -> Result<Credentials, AppError> {
        dotenvy::dotenv().ok();
        resolve_credentials(
            std::env::var(ENV_USERNAME).ok(),
            std::env::var(ENV_PASSWORD).ok(),
            self.get_opt_str("auth.username"),
            self.get_opt_str("auth.password"),
        )
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(self.get_str("output.directory", "output"))
    }

    pub fn grades_path(&self) -> PathBuf {
        self.output_dir()
            .join(self.get_str("output.grades_filename", "grades.csv"))
    }

    pub fn plan_path(&self) -> PathBuf {
        self.output_dir().join(self.get_str("output.plan_filename", "plan.csv"))
    }
}

fn resolve_credentials(
    env_username: Option<String>,
    env_password: Option<String>,
    file_username: Option<String>,
    file_password: Option<String>,
) -> Result<Credentials, AppError> {
    let pick = |env: Option<String>, file: Option<String>| env.filter(|s| !s.is_empty()).or(file);
    match (pick(env_username, file_username), pick(env_password, file_password)) {
        (Some(username), Some(password)) => Ok(Credentials { username, password }),
        _ => Err(AppError::config(format!(
            "Missing username or password: set auth.username/auth.password in the config or {ENV_USERNAME}/{ENV_PASSWORD}."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Config {
        Config::from_value(json!({
            "auth": { "username": "20210001", "password": "pw" },
            "output": { "directory": "out" },
            "neu_login": { "bypass_proxy": true },
            "service_data": { "plan_id": 4068 },
            "auto": { "check_interval": "600" },
            "email": { "smtp_server": "  " }
        }))
    }

    #[test]
    fn dotted_lookup() {
        let c = sample();
        assert_eq!(c.get("auth.username"), Some(&json!("20210001")));
        assert_eq!(c.get("auth.missing"), None);
        assert_eq!(c.get("auth.username.deeper"), None);
    }

    #[test]
    fn typed_getters_with_defaults() {
        let c = sample();
        assert!(c.get_bool("neu_login.bypass_proxy", false));
        assert!(!c.get_bool("neu_login.other", false));
        assert_eq!(c.get_str("service_data.plan_id", "1"), "4068");
        assert_eq!(c.get_u64("auto.check_interval", 3600), 600);
        assert_eq!(c.get_u64("auto.night_interval", 7200), 7200);
        assert_eq!(c.get_opt_str("email.smtp_server"), None);
        assert_eq!(c.output_dir(), PathBuf::from("out"));
        assert_eq!(c.grades_path(), PathBuf::from("out").join("grades.csv"));
    }

    #[test]
    fn environment_overrides_file_credentials() {
        let creds = resolve_credentials(
            Some("env-user".into()),
            None,
            Some("file-user".into()),
            Some("file-pw".into()),
        )
        .unwrap();
        assert_eq!(creds.username, "env-user");
        assert_eq!(creds.password, "file-pw");
    }

    #[test]
    fn missing_password_is_config_error() {
        let err = resolve_credentials(None, Some(String::new()), Some("u".into()), None).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(Path::new("definitely/not/here.json")).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG);
    }

    #[test]
    fn load_reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"auth":{"username":"a","password":"b"}}"#).unwrap();
        let c = Config::load(&path).unwrap();
        assert_eq!(c.get_opt_str("auth.password").as_deref(), Some("b"));
    }
}
