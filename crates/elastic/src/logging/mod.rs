//! Structured logging wire-up.
//!
//! [`init_logging`] installs a `tracing` subscriber with an env filter, a
//! console layer and, when a client is given, an [`ElasticLogLayer`] that
//! ships events to Elasticsearch in batches from a background task.
//!
//! ```ignore
//! let config = ElasticConfiguration::new("http://localhost:9200")
//!     .with_application_name("catalog-api");
//! let client = ElasticClient::new(&config)?;
//! let guard = init_logging(&LoggingConfig::from_elastic(&config), Some(&client));
//! // ... run the application ...
//! guard.shutdown().await;
//! ```

mod correlation;
mod layer;
mod record;
mod shipper;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::client::ElasticClient;
use crate::config::ElasticConfiguration;

pub use correlation::{
    CORRELATION_ID_FIELD, correlation_span, correlation_span_with, new_correlation_id,
};
pub use layer::ElasticLogLayer;
pub use record::LogRecord;
pub use shipper::{format_index_name, index_pattern};

use shipper::LogShipper;

/// Application name used when none is configured.
pub const DEFAULT_APPLICATION_NAME: &str = "helios";

/// Logging settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all targets (error, warn, info, debug, trace).
    pub level: String,
    /// Per-target level overrides as `(target, level)`.
    pub overrides: Vec<(String, String)>,
    /// Written to every shipped record as `service.name`.
    pub application_name: String,
    /// Target index, with strftime placeholders. Defaults to
    /// `logs-{application}-%Y.%m.%d`.
    pub index_format: Option<String>,
    /// Target prefixes whose events are not shipped.
    pub excluded_targets: Vec<String>,
    /// Records per bulk request.
    pub batch_size: usize,
    /// Maximum time a record waits in a partial batch.
    pub flush_interval: Duration,
    /// Capacity of the queue between the layer and the shipper.
    pub queue_capacity: usize,
    /// Whether to write to the console.
    pub console: bool,
    /// Whether the shipper registers an index template for the log indices
    /// when it starts.
    pub register_template: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            overrides: vec![
                ("tower_http".to_string(), "info".to_string()),
                ("hyper".to_string(), "warn".to_string()),
                ("reqwest".to_string(), "warn".to_string()),
            ],
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            index_format: None,
            excluded_targets: vec!["tower_http::services::fs".to_string()],
            batch_size: 50,
            flush_interval: Duration::from_secs(2),
            queue_capacity: 10_000,
            console: true,
            register_template: true,
        }
    }
}

impl LoggingConfig {
    /// Derives logging settings from the cluster configuration: the
    /// application name and, if set, the default index as the log index.
    pub fn from_elastic(config: &ElasticConfiguration) -> Self {
        let mut logging = Self::default();
        if let Some(name) = config.application_name.as_deref().filter(|n| !n.is_empty()) {
            logging.application_name = name.to_string();
        }
        logging.index_format = config.default_index().map(String::from);
        logging
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_override(mut self, target: impl Into<String>, level: impl Into<String>) -> Self {
        self.overrides.push((target.into(), level.into()));
        self
    }

    pub fn with_index_format(mut self, format: impl Into<String>) -> Self {
        self.index_format = Some(format.into());
        self
    }

    pub fn exclude_target(mut self, target: impl Into<String>) -> Self {
        self.excluded_targets.push(target.into());
        self
    }

    pub fn with_template_registration(mut self, register: bool) -> Self {
        self.register_template = register;
        self
    }

    /// The env-filter directives used when `RUST_LOG` is unset.
    pub fn filter_directives(&self) -> String {
        std::iter::once(self.level.clone())
            .chain(
                self.overrides
                    .iter()
                    .map(|(target, level)| format!("{}={}", target, level)),
            )
            .collect::<Vec<_>>()
            .join(",")
    }

    /// The effective index format.
    pub fn index_format(&self) -> String {
        self.index_format
            .clone()
            .unwrap_or_else(|| format!("logs-{}-%Y.%m.%d", index_safe(&self.application_name)))
    }
}

/// Lower-cases and replaces characters that are not valid in index names.
fn index_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// Keeps the shipper running. Call [`LoggingGuard::shutdown`] before exit to
/// flush pending records.
#[derive(Debug)]
pub struct LoggingGuard {
    shipper: Option<ShipperHandle>,
    dropped: Arc<AtomicU64>,
}

#[derive(Debug)]
struct ShipperHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl LoggingGuard {
    fn console_only() -> Self {
        Self {
            shipper: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns true if records are being shipped to Elasticsearch.
    pub fn is_shipping(&self) -> bool {
        self.shipper.is_some()
    }

    /// Number of records dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Flushes pending records and stops the shipper.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.shipper.take() {
            let _ = handle.shutdown.send(());
            if let Err(e) = handle.task.await {
                eprintln!("Log shipper terminated abnormally: {}", e);
            }
        }
    }
}

/// Builds the shipping layer and spawns its shipper task.
///
/// Must be called from within a Tokio runtime. Use this to compose the layer
/// into a custom subscriber; [`init_logging`] does it for the common case.
pub fn elastic_log_layer(
    config: &LoggingConfig,
    client: ElasticClient,
) -> (ElasticLogLayer, LoggingGuard) {
    let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let dropped = Arc::new(AtomicU64::new(0));

    let shipper = LogShipper::new(
        client,
        receiver,
        shutdown_rx,
        config.index_format(),
        config.batch_size,
        config.flush_interval,
    )
    .with_template(config.register_template);
    let task = tokio::spawn(shipper.run());

    let layer = ElasticLogLayer::new(
        sender,
        Some(config.application_name.clone()),
        config.excluded_targets.clone(),
        dropped.clone(),
    );

    let guard = LoggingGuard {
        shipper: Some(ShipperHandle {
            shutdown: shutdown_tx,
            task,
        }),
        dropped,
    };

    (layer, guard)
}

/// Initializes the global tracing subscriber.
///
/// This should be called once at application startup. `RUST_LOG` takes
/// precedence over the configured level and overrides. Shipping requires a
/// Tokio runtime; without one only the console layer is installed.
pub fn init_logging(config: &LoggingConfig, client: Option<&ElasticClient>) -> LoggingGuard {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directives()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = config.console.then(fmt::layer);

    let (elastic, guard) = match client {
        Some(client) if tokio::runtime::Handle::try_current().is_ok() => {
            let (layer, guard) = elastic_log_layer(config, client.clone());
            (Some(layer), guard)
        }
        Some(_) => {
            eprintln!("Log shipping disabled: no Tokio runtime available");
            (None, LoggingGuard::console_only())
        }
        None => (None, LoggingGuard::console_only()),
    };

    let shipping = guard.is_shipping();
    if let Err(e) = tracing_subscriber::registry()
        .with(console)
        .with(elastic)
        .with(filter)
        .try_init()
    {
        eprintln!("Logging already initialized: {}", e);
        return guard;
    }

    tracing::debug!(
        application = %config.application_name,
        shipping,
        index_format = %config.index_format(),
        "Logging initialized"
    );
    guard
}
