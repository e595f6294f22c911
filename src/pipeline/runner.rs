//! # Station Runner
//!
//! The two periodic tasks of the daemon:
//!
//! - **Sampling** (every `sampling.interval_ms`): owns the device link and
//!   pushes one sample per tick into the window.
//! - **Aggregation** (every `aggregation.interval_s`): snapshots the window,
//!   reduces it, persists the record and dispatches it.
//!
//! They share nothing but the [`WindowBuffer`]. Dispatch retries run on the
//! aggregation task, so a slow collector never delays sampling.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use super::aggregator::{reduce, AggregatedRecord};
use super::collector::SampleCollector;
use super::sample::Schema;
use super::window::WindowBuffer;
use crate::config::Config;
use crate::device::DeviceLink;
use crate::error::{Result, StationError};
use crate::storage::{BoundedLog, DailyRawLog};
use crate::telemetry::{Dispatcher, RetryPolicy, TelemetryTransport};

/// Current wall-clock time in Unix seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Work done on each aggregation tick
#[derive(Debug)]
pub struct AggregationTask {
    window: WindowBuffer,
    bounded_log: BoundedLog,
    raw_log: Option<DailyRawLog>,
    dispatcher: Option<Dispatcher>,
    /// Window push counter at the previous tick
    last_pushed_total: u64,
}

impl AggregationTask {
    pub fn new(
        window: WindowBuffer,
        bounded_log: BoundedLog,
        raw_log: Option<DailyRawLog>,
        dispatcher: Option<Dispatcher>,
    ) -> Self {
        Self {
            window,
            bounded_log,
            raw_log,
            dispatcher,
            last_pushed_total: 0,
        }
    }

    /// Build the task from configuration
    ///
    /// `transport` is ignored when dispatch is disabled.
    pub fn from_config(
        config: &Config,
        schema: &Schema,
        window: WindowBuffer,
        transport: Option<Arc<dyn TelemetryTransport>>,
    ) -> Self {
        let data_dir = &config.storage.data_dir;
        let bounded_log = BoundedLog::in_data_dir(data_dir, schema.header(), config.storage.storage_size);
        let raw_log = config
            .storage
            .raw_log_enabled
            .then(|| DailyRawLog::new(data_dir.clone(), schema.header()));
        let dispatcher = transport.filter(|_| config.dispatch.enabled).map(|transport| {
            Dispatcher::new(
                config.station.clone(),
                schema.clone(),
                transport,
                data_dir,
                RetryPolicy::from(&config.dispatch),
            )
        });

        Self::new(window, bounded_log, raw_log, dispatcher)
    }

    /// Reduce the current window and hand the record to storage and dispatch
    ///
    /// Returns `None` (and touches nothing) when the window is empty.
    /// Storage failures are logged and never stop the tick.
    pub async fn tick(&mut self, now: i64) -> Option<AggregatedRecord> {
        let snapshot = self.window.snapshot();
        let Some(record) = reduce(&snapshot.samples, now) else {
            debug!("Window is empty, skipping aggregation");
            return None;
        };

        match self.raw_log.clone() {
            Some(raw_log) => {
                let fresh = snapshot.pushed_since(self.last_pushed_total).to_vec();
                match blocking(move || raw_log.append(&fresh)).await {
                    Ok(()) => self.last_pushed_total = snapshot.pushed_total,
                    // keep the counter so the next tick retries these samples
                    Err(e) => error!("Failed to append raw samples: {}", e),
                }
            }
            None => self.last_pushed_total = snapshot.pushed_total,
        }

        let bounded_log = self.bounded_log.clone();
        let row = record.clone();
        if let Err(e) = blocking(move || bounded_log.append(&row)).await {
            error!(
                "Failed to update {}: {}",
                self.bounded_log.path().display(),
                e
            );
        }

        if let Some(dispatcher) = &self.dispatcher {
            let outcome = dispatcher.send(&record).await;
            debug!("Dispatch outcome for {}: {:?}", record.timestamp, outcome);
        }

        Some(record)
    }
}

/// Run file I/O on the blocking pool
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StationError::Io(io::Error::other(e)))?
}

/// Run both tasks until `shutdown` resolves
///
/// # Examples
///
/// ```no_run
/// use weather_station::config::Config;
/// use weather_station::device::DeviceLink;
/// use weather_station::pipeline::runner::run;
/// use weather_station::serial::SensorSerial;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = Config::load("config/default.toml")?;
///     let serial = SensorSerial::open_with_paths(&[config.serial.port.as_str()], config.serial.baud_rate)?;
///     let link = DeviceLink::from_config(serial.into_port(), &config.serial);
///     run(config, link, None, async {
///         let _ = tokio::signal::ctrl_c().await;
///     })
///     .await;
///     Ok(())
/// }
/// ```
pub async fn run<F>(
    config: Config,
    link: DeviceLink,
    transport: Option<Arc<dyn TelemetryTransport>>,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let schema = Schema::new(&config.sampling.metrics);
    let window = WindowBuffer::new(config.sampling.window_size);

    let mut collector = SampleCollector::new(
        link,
        config.sampling.metrics.clone(),
        window.clone(),
        Duration::from_millis(config.serial.inter_request_delay_ms),
    );
    let mut aggregation = AggregationTask::from_config(&config, &schema, window, transport);

    let sampling_period = Duration::from_millis(config.sampling.interval_ms);
    let aggregation_period = Duration::from_secs(config.aggregation.interval_s);

    info!(
        "Sampling {} columns every {:?}, aggregating every {:?}",
        schema.len(),
        sampling_period,
        aggregation_period
    );

    let mut sampling_handle = tokio::spawn(async move {
        let mut ticker = interval(sampling_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            collector.collect(unix_now()).await;
        }
    });

    let mut aggregation_handle = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + aggregation_period, aggregation_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Some(record) = aggregation.tick(unix_now()).await {
                info!("Aggregated record {}", record.to_csv_row());
            }
        }
    });

    tokio::select! {
        _ = shutdown => {
            info!("Shutdown requested, stopping tasks");
        }
        result = &mut sampling_handle => {
            error!("Sampling task stopped unexpectedly: {:?}", result);
        }
        result = &mut aggregation_handle => {
            error!("Aggregation task stopped unexpectedly: {:?}", result);
        }
    }

    sampling_handle.abort();
    aggregation_handle.abort();
}
