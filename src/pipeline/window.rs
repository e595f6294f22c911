//! # Window Buffer
//!
//! Fixed-capacity ring of raw samples shared between the sampling task
//! (sole writer) and the aggregation task (sole reader). A single mutex
//! guards both `push` and `snapshot`, so the reader always sees a whole
//! window and never a half-written one.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

use super::sample::Sample;

/// Consistent copy of the window at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSnapshot {
    /// Buffered samples, oldest first
    pub samples: Vec<Sample>,
    /// Samples pushed since the buffer was created (including evicted ones)
    pub pushed_total: u64,
}

impl WindowSnapshot {
    /// The samples pushed after a previous snapshot's `pushed_total`
    ///
    /// Samples evicted in between are gone and are not reported.
    pub fn pushed_since(&self, previous_total: u64) -> &[Sample] {
        let fresh = self.pushed_total.saturating_sub(previous_total);
        let fresh = usize::try_from(fresh).unwrap_or(usize::MAX).min(self.samples.len());
        &self.samples[self.samples.len() - fresh..]
    }
}

#[derive(Debug)]
struct Ring {
    samples: VecDeque<Sample>,
    capacity: usize,
    pushed_total: u64,
}

/// Cloneable handle to the shared window
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    inner: Arc<Mutex<Ring>>,
}

impl WindowBuffer {
    /// Create an empty window holding at most `capacity` samples
    ///
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(Ring {
                samples: VecDeque::with_capacity(capacity),
                capacity,
                pushed_total: 0,
            })),
        }
    }

    /// Append a sample, evicting the oldest when full
    ///
    /// A timestamp older than the newest buffered sample (wall clock stepped
    /// back) is clamped to it so the window stays time-ordered.
    pub fn push(&self, mut sample: Sample) {
        let mut ring = self.lock();

        if let Some(newest) = ring.samples.back() {
            if sample.timestamp < newest.timestamp {
                warn!(
                    "Sample timestamp {} is older than {}, clamping",
                    sample.timestamp, newest.timestamp
                );
                sample.timestamp = newest.timestamp;
            }
        }

        if ring.samples.len() == ring.capacity {
            ring.samples.pop_front();
        }
        ring.samples.push_back(sample);
        ring.pushed_total += 1;
    }

    /// Copy the current window without draining it
    pub fn snapshot(&self) -> WindowSnapshot {
        let ring = self.lock();
        WindowSnapshot {
            samples: ring.samples.iter().cloned().collect(),
            pushed_total: ring.pushed_total,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        // ring stays consistent across a panic, poisoning is ignored
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: i64, v: f64) -> Sample {
        Sample::new(ts, vec![v])
    }

    #[test]
    fn test_push_and_snapshot() {
        let window = WindowBuffer::new(3);
        assert!(window.is_empty());

        window.push(sample(1, 1.0));
        window.push(sample(2, 2.0));

        let snap = window.snapshot();
        assert_eq!(snap.samples, vec![sample(1, 1.0), sample(2, 2.0)]);
        assert_eq!(snap.pushed_total, 2);
        // snapshot does not drain
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let window = WindowBuffer::new(3);
        for i in 0..5 {
            window.push(sample(i, i as f64));
        }

        let snap = window.snapshot();
        assert_eq!(window.len(), 3);
        assert_eq!(
            snap.samples.iter().map(|s| s.timestamp).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
        assert_eq!(snap.pushed_total, 5);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let window = WindowBuffer::new(0);
        window.push(sample(1, 1.0));
        window.push(sample(2, 2.0));
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.snapshot().samples, vec![sample(2, 2.0)]);
    }

    #[test]
    fn test_backwards_timestamp_is_clamped() {
        let window = WindowBuffer::new(4);
        window.push(sample(10, 1.0));
        window.push(sample(7, 2.0));

        let timestamps: Vec<i64> = window.snapshot().samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![10, 10]);
    }

    #[test]
    fn test_pushed_since() {
        let window = WindowBuffer::new(4);
        window.push(sample(1, 1.0));
        window.push(sample(2, 2.0));
        let first = window.snapshot();
        assert_eq!(first.pushed_since(0).len(), 2);

        window.push(sample(3, 3.0));
        let second = window.snapshot();
        assert_eq!(second.pushed_since(first.pushed_total), &[sample(3, 3.0)]);

        // more pushed than the window holds: only what is still buffered
        for i in 4..12 {
            window.push(sample(i, i as f64));
        }
        let third = window.snapshot();
        assert_eq!(third.pushed_since(second.pushed_total).len(), 4);
        assert!(third.pushed_since(third.pushed_total).is_empty());
    }

    #[test]
    fn test_concurrent_push_and_snapshot_never_tears() {
        let window = WindowBuffer::new(16);
        let writer = {
            let window = window.clone();
            std::thread::spawn(move || {
                for i in 0..2000 {
                    window.push(Sample::new(i, vec![i as f64, i as f64]));
                }
            })
        };

        for _ in 0..200 {
            let snap = window.snapshot();
            assert!(snap.samples.len() <= 16);
            for pair in snap.samples.windows(2) {
                assert!(pair[0].timestamp <= pair[1].timestamp);
            }
            for s in &snap.samples {
                assert_eq!(s.values, vec![s.timestamp as f64, s.timestamp as f64]);
            }
        }

        writer.join().unwrap();
        assert_eq!(window.snapshot().pushed_total, 2000);
    }
}
