use std::env;
use tracing::Level;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServiceIdentity {
    pub(crate) service_name: String,
    pub(crate) stage: String,
    pub(crate) component: String,
}

#[derive(Debug, Clone)]
pub(crate) struct AlertSinkConfig {
    pub(crate) webhook_url: Url,
    pub(crate) min_level: Level,
}

#[derive(Debug, Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) identity: ServiceIdentity,
    pub(crate) alerts: Option<AlertSinkConfig>,
    /// Logged once the subscriber is installed.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(component: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let component = component.trim().to_string();

        let identity = ServiceIdentity {
            service_name: non_empty("SERVICE_NAME").unwrap_or_else(|| component.clone()),
            stage: non_empty("STAGE").unwrap_or_else(|| "unknown".to_string()),
            component,
        };

        let mut warnings = Vec::new();
        let enabled = non_empty("DISCORD_NOTIFY_ENABLED")
            .and_then(|raw| parse_bool(&raw))
            .unwrap_or(true);

        let webhook_url = match non_empty("DISCORD_WEBHOOK_URL") {
            Some(raw) if enabled => match Url::parse(raw.trim()) {
                Ok(url) => Some(url),
                Err(err) => {
                    // The raw value is a secret; only the parse error is reported.
                    warnings.push(format!(
                        "DISCORD_WEBHOOK_URL is invalid ({err}); error alerts disabled"
                    ));
                    None
                }
            },
            _ => None,
        };

        let alerts = webhook_url.map(|webhook_url| {
            let min_level = match non_empty("DISCORD_NOTIFY_LEVEL") {
                Some(raw) => parse_level(&raw).unwrap_or_else(|| {
                    warnings.push(format!(
                        "DISCORD_NOTIFY_LEVEL has unknown value {raw:?}; using ERROR"
                    ));
                    Level::ERROR
                }),
                None => Level::ERROR,
            };
            AlertSinkConfig {
                webhook_url,
                min_level,
            }
        });

        Self {
            identity,
            alerts,
            warnings,
        }
    }
}

fn parse_level(input: &str) -> Option<Level> {
    match input.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
