mod alert;
mod config;
mod discord;

use alert::{AlertDispatcher, AlertLayer};
use anyhow::Result;
use config::ObservabilityConfig;
use discord::DiscordAlertSink;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Installs the global subscriber: local-time fmt output filtered by `RUST_LOG`
/// (default `info`) plus an optional Discord alert layer.
///
/// Must be called from inside a Tokio runtime when alerts are configured.
pub fn init_observability(component: &str) -> Result<()> {
    let config = ObservabilityConfig::from_env(component);

    let alert_layer = match config.alerts.as_ref() {
        Some(alerts) => {
            let sink = DiscordAlertSink::new(alerts.webhook_url.clone())?;
            let dispatcher = AlertDispatcher::spawn(vec![Arc::new(sink)]);
            Some(
                AlertLayer::new(dispatcher, config.identity.clone(), alerts.min_level)
                    .with_filter(LevelFilter::from_level(alerts.min_level)),
            )
        }
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Local timestamps so `TZ` is honoured in log output.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    let identity = &config.identity;
    for warning in &config.warnings {
        warn!(
            service = %identity.service_name,
            stage = %identity.stage,
            component = %identity.component,
            %warning,
            "observability config warning"
        );
    }

    info!(
        service = %identity.service_name,
        stage = %identity.stage,
        component = %identity.component,
        alerts_enabled = config.alerts.is_some(),
        "observability initialized"
    );

    Ok(())
}
