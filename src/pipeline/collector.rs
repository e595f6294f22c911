//! # Sample Collector
//!
//! Drives the device link once per metric per sampling tick and pushes the
//! assembled sample into the window.

use std::time::Duration;
use tracing::{debug, warn};

use super::sample::Sample;
use super::window::WindowBuffer;
use crate::device::DeviceLink;
use crate::modbus::protocol::Metric;

/// Polls the sensor and feeds the window buffer
#[derive(Debug)]
pub struct SampleCollector {
    link: DeviceLink,
    metrics: Vec<Metric>,
    window: WindowBuffer,
    /// Device turnaround between consecutive requests
    inter_request_delay: Duration,
    /// Reads that came back unavailable since startup
    failed_reads: u64,
}

impl SampleCollector {
    pub fn new(
        link: DeviceLink,
        metrics: Vec<Metric>,
        window: WindowBuffer,
        inter_request_delay: Duration,
    ) -> Self {
        Self {
            link,
            metrics,
            window,
            inter_request_delay,
            failed_reads: 0,
        }
    }

    /// Take one sample stamped `timestamp` and push it into the window
    ///
    /// Unavailable reads are recorded as 0.0 and never abort the sample.
    pub async fn collect(&mut self, timestamp: i64) -> Sample {
        let mut values = Vec::with_capacity(self.metrics.len() + 2);
        let mut failed = 0usize;

        let reading = self.link.poll_temperature_humidity().await;
        if !reading.is_available() {
            debug!("Temperature/humidity read unavailable");
            failed += 1;
        }
        let (temperature, humidity) = reading.or_sentinel();
        values.push(temperature);
        values.push(humidity);
        pause(self.inter_request_delay).await;

        for &metric in &self.metrics {
            let reading = self.link.poll(metric).await;
            if !reading.is_available() {
                debug!("{} read unavailable", metric);
                failed += 1;
            }
            values.push(reading.or_sentinel());
            pause(self.inter_request_delay).await;
        }

        if failed == self.metrics.len() + 1 {
            warn!("Sensor did not answer any request; recording zeros");
        }
        self.failed_reads += failed as u64;

        let sample = Sample::new(timestamp, values);
        self.window.push(sample.clone());
        sample
    }

    /// Total unavailable reads since startup
    pub fn failed_reads(&self) -> u64 {
        self.failed_reads
    }
}

/// Device turnaround between requests
async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::decoder::encode_reply;
    use crate::serial::port_trait::mocks::MockSerialPort;

    fn collector(mock: &MockSerialPort, metrics: Vec<Metric>, window: &WindowBuffer) -> SampleCollector {
        let link = DeviceLink::new(Box::new(mock.clone()), Duration::ZERO, Duration::from_millis(5));
        SampleCollector::new(link, metrics, window.clone(), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_collect_polls_in_schema_order() {
        let mock = MockSerialPort::with_replies(vec![
            encode_reply(&[505, 202]), // humidity 50.5, temperature 20.2
            encode_reply(&[1013]),     // pressure
            encode_reply(&[120]),      // rain 12.0
        ]);
        let window = WindowBuffer::new(30);
        let mut collector = collector(&mock, vec![Metric::Pressure, Metric::Rain], &window);

        let sample = collector.collect(100).await;

        assert_eq!(sample.timestamp, 100);
        assert_eq!(sample.values.len(), 4);
        assert!((sample.values[0] - 20.2).abs() < 1e-9);
        assert!((sample.values[1] - 50.5).abs() < 1e-9);
        assert_eq!(sample.values[2], 1013.0);
        assert_eq!(sample.values[3], 12.0);

        let written = mock.get_written_data();
        assert_eq!(written.len(), 3);
        assert_eq!(written[1], Metric::Pressure.request_frame().to_vec());
        assert_eq!(written[2], Metric::Rain.request_frame().to_vec());

        assert_eq!(window.snapshot().samples, vec![sample]);
        assert_eq!(collector.failed_reads(), 0);
    }

    #[tokio::test]
    async fn test_failed_read_is_recorded_as_zero() {
        let mock = MockSerialPort::with_replies(vec![
            encode_reply(&[505, 202]),
            vec![0x01, 0x03], // truncated pressure reply
            encode_reply(&[120]),
        ]);
        let window = WindowBuffer::new(30);
        let mut collector = collector(&mock, vec![Metric::Pressure, Metric::Rain], &window);

        let sample = collector.collect(100).await;

        assert_eq!(sample.values.len(), 4);
        assert_eq!(sample.values[2], 0.0);
        assert_eq!(sample.values[3], 12.0);
        assert_eq!(collector.failed_reads(), 1);
        assert_eq!(window.len(), 1);
    }

    #[tokio::test]
    async fn test_silent_sensor_still_produces_sample() {
        let mock = MockSerialPort::new();
        let window = WindowBuffer::new(30);
        let mut collector = collector(&mock, vec![Metric::Pressure, Metric::Rain], &window);

        let sample = collector.collect(5).await;

        assert_eq!(sample.values, vec![0.0; 4]);
        assert_eq!(collector.failed_reads(), 3);
        assert_eq!(window.len(), 1);
    }

    #[tokio::test]
    async fn test_collect_runs_on_spawned_task() {
        let mock = MockSerialPort::with_replies(vec![
            encode_reply(&[505, 202]),
            encode_reply(&[120]),
        ]);
        let window = WindowBuffer::new(30);
        let link = DeviceLink::new(Box::new(mock.clone()), Duration::ZERO, Duration::from_millis(5));
        let mut collector =
            SampleCollector::new(link, vec![Metric::Rain], window.clone(), Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let sample = collector.collect(7).await;
            (sample, collector.failed_reads())
        });
        let (sample, failed) = handle.await.unwrap();

        assert_eq!(sample.timestamp, 7);
        assert_eq!(sample.values[2], 12.0);
        assert_eq!(failed, 0);
        assert_eq!(window.len(), 1);
    }
}
