//! Operator configuration
//!
//! Configuration is read from environment variables. Keys are written in
//! dotted form (`Rancher.Url`) and looked up under both the
//! double-underscore environment name (`RANCHER__URL`, the section
//! separator convention) and the flat single-underscore name
//! (`RANCHER_URL`).

use std::str::FromStr;
use std::time::Duration;

use rancher_client::Credentials;

use crate::error::ControllerError;

/// How the observe loop discovers namespaces in downstream clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveMethod {
    /// Streaming namespace watch per cluster (default)
    Watch,
    /// Periodic full namespace listing per cluster
    Poll,
    /// Observe loop idles
    None,
}

impl FromStr for ObserveMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "watch" => Ok(Self::Watch),
            "poll" => Ok(Self::Poll),
            "none" => Ok(Self::None),
            other => Err(format!("unknown observe method '{other}'")),
        }
    }
}

/// Operator configuration
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Platform base URL
    pub rancher_url: String,
    /// API token or username/password login
    pub credentials: Credentials,
    /// Disable TLS certificate verification towards the platform
    pub allow_insecure_ssl: bool,
    /// Arms Delete-policy namespace deletion
    pub cleanup_namespaces: bool,
    /// Observe loop mode
    pub observe_method: ObserveMethod,
    /// Observe loop cluster-set refresh interval
    pub cluster_check_interval: Duration,
    /// Poll-mode namespace sweep interval
    pub polling_interval: Duration,
}

impl OperatorConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup. Each dotted key
    /// is tried under its double-underscore and flat environment names.
    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ControllerError> {
        let get = |dotted: &str| -> Option<String> {
            lookup(&env_name(dotted, "__")).or_else(|| lookup(&env_name(dotted, "_")))
        };

        let rancher_url = get("Rancher.Url")
            .ok_or_else(|| ControllerError::InvalidConfig("Rancher.Url is required".to_string()))?;

        let credentials = match get("Rancher.Token") {
            Some(token) => Credentials::Token(token),
            None => {
                let username = get("Rancher.Username").ok_or_else(|| {
                    ControllerError::InvalidConfig(
                        "either Rancher.Token or Rancher.Username/Rancher.Password is required"
                            .to_string(),
                    )
                })?;
                let password = get("Rancher.Password").ok_or_else(|| {
                    ControllerError::InvalidConfig(
                        "Rancher.Password is required when Rancher.Username is set".to_string(),
                    )
                })?;
                Credentials::Login { username, password }
            }
        };

        let allow_insecure_ssl = parse_bool_key(&get, "Rancher.AllowInsecureSsl")?.unwrap_or(false);

        // Accepted both bare and under the Rancher section
        let cleanup_namespaces = match parse_bool_key(&get, "CleanupNamespaces")? {
            Some(v) => v,
            None => parse_bool_key(&get, "Rancher.CleanupNamespaces")?.unwrap_or(false),
        };

        let observe_method = match get("ObserveMethod") {
            Some(raw) => raw
                .parse()
                .map_err(ControllerError::InvalidConfig)?,
            None => ObserveMethod::Watch,
        };

        let cluster_check_interval = parse_minutes_key(&get, "ClusterCheckInterval", 5)?;
        let polling_interval = parse_minutes_key(&get, "PollingInterval", 2)?;

        Ok(Self {
            rancher_url,
            credentials,
            allow_insecure_ssl,
            cleanup_namespaces,
            observe_method,
            cluster_check_interval,
            polling_interval,
        })
    }
}

/// Maps a dotted config key to its environment name:
/// `Rancher.AllowInsecureSsl` -> `RANCHER__ALLOW_INSECURE_SSL` (separator
/// `__`) or `RANCHER_ALLOW_INSECURE_SSL` (separator `_`).
fn env_name(dotted: &str, separator: &str) -> String {
    dotted
        .split('.')
        .map(camel_to_screaming_snake)
        .collect::<Vec<_>>()
        .join(separator)
}

fn camel_to_screaming_snake(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 4);
    let chars: Vec<char> = segment.chars().collect();
    for (i, ch) in chars.iter().enumerate() {
        if ch.is_ascii_uppercase() && i > 0 {
            let prev_lower = chars[i - 1].is_ascii_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|c| c.is_ascii_lowercase());
            if prev_lower || next_lower {
                out.push('_');
            }
        }
        out.push(ch.to_ascii_uppercase());
    }
    out
}

fn parse_bool_key(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<bool>, ControllerError> {
    match get(key) {
        None => Ok(None),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(ControllerError::InvalidConfig(format!(
                "{key} must be a boolean, got '{raw}'"
            ))),
        },
    }
}

fn parse_minutes_key(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default_minutes: u64,
) -> Result<Duration, ControllerError> {
    match get(key) {
        None => Ok(Duration::from_secs(default_minutes * 60)),
        Some(raw) => {
            let minutes: u64 = raw.parse().map_err(|_| {
                ControllerError::InvalidConfig(format!("{key} must be minutes, got '{raw}'"))
            })?;
            Ok(Duration::from_secs(minutes * 60))
        }
    }
}
