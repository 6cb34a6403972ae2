use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{collections::BTreeMap, fmt, sync::Arc};
use tokio::sync::mpsc;
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    warn,
};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

use super::config::ServiceIdentity;

const ALERT_QUEUE_CAPACITY: usize = 256;
const REDACTED: &str = "[REDACTED]";

/// A log event worth paging on, detached from the tracing machinery.
#[derive(Debug, Clone)]
pub(crate) struct AlertRecord {
    pub(crate) level: Level,
    pub(crate) occurred_at: DateTime<Utc>,
    pub(crate) identity: ServiceIdentity,
    pub(crate) target: String,
    pub(crate) location: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) fields: BTreeMap<String, String>,
    pub(crate) span_path: Vec<String>,
}

#[async_trait]
pub(crate) trait AlertSink: Send + Sync {
    fn name(&self) -> &'static str;
    async fn deliver(&self, record: &AlertRecord) -> Result<()>;
}

/// Hands records to a background task so logging never waits on the network.
#[derive(Clone)]
pub(crate) struct AlertDispatcher {
    tx: mpsc::Sender<AlertRecord>,
}

impl AlertDispatcher {
    pub(crate) fn spawn(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<AlertRecord>(ALERT_QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                for sink in &sinks {
                    if let Err(error) = sink.deliver(&record).await {
                        // Target is filtered out of the alert layer to avoid a feedback loop.
                        warn!(target: "observability", sink = sink.name(), %error, "alert delivery failed");
                    }
                }
            }
        });

        Self { tx }
    }

    fn dispatch(&self, record: AlertRecord) {
        if let Err(err) = self.tx.try_send(record) {
            let reason = match err {
                mpsc::error::TrySendError::Full(_) => "queue full",
                mpsc::error::TrySendError::Closed(_) => "queue closed",
            };
            warn!(target: "observability", reason, "alert dropped");
        }
    }
}

pub(crate) struct AlertLayer {
    dispatcher: AlertDispatcher,
    identity: ServiceIdentity,
    min_level: Level,
}

impl AlertLayer {
    pub(crate) fn new(dispatcher: AlertDispatcher, identity: ServiceIdentity, min_level: Level) -> Self {
        Self {
            dispatcher,
            identity,
            min_level,
        }
    }
}

#[derive(Default)]
struct FieldCollector {
    fields: BTreeMap<String, String>,
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: String) {
        let name = field.name();
        let value = if is_sensitive_field(name) {
            REDACTED.to_string()
        } else {
            value
        };
        self.fields.insert(name.to_string(), value);
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{value:?}"));
    }
}

impl<S> Layer<S> for AlertLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // Level ordering is inverted: ERROR is the smallest.
        if *metadata.level() > self.min_level || metadata.target() == "observability" {
            return;
        }

        let mut collector = FieldCollector::default();
        event.record(&mut collector);
        let message = collector.fields.remove("message");

        let span_path = ctx
            .event_span(event)
            .map(|span| {
                span.scope()
                    .from_root()
                    .map(|s| s.metadata().name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let location = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => Some(format!("{file}:{line}")),
            _ => None,
        };

        self.dispatcher.dispatch(AlertRecord {
            level: *metadata.level(),
            occurred_at: Utc::now(),
            identity: self.identity.clone(),
            target: metadata.target().to_string(),
            location,
            message,
            fields: collector.fields,
            span_path,
        });
    }
}

pub(crate) fn is_sensitive_field(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    ["secret", "password", "token", "authorization", "webhook"]
        .iter()
        .any(|needle| name.contains(needle))
}
