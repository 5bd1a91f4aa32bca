//! Flush cadence of a running measurement.
//!
//! MDF4 writers keep the records of a measurement in memory and write them
//! out as data blocks whenever the [`FlushPolicy`] says so. Each flush leaves
//! a readable (if unfinalized) file behind, so long captures neither grow
//! memory without bound nor lose everything on a crash.
//!
//! ```
//! use mdf_rs::{FlushPolicy, StreamingConfig};
//!
//! let config = StreamingConfig::every_n_records(1000);
//! assert_eq!(config.policy, FlushPolicy::EveryNRecords(1000));
//! ```

/// Bytes buffered before an automatic flush, unless configured otherwise.
pub const DEFAULT_FLUSH_BYTES: u64 = 4 * 1024 * 1024;

/// When buffered records are written to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlushPolicy {
    /// Only at `stop_measurement` or on an explicit `flush()`.
    #[default]
    Manual,
    /// After this many records, counted over all channel groups.
    EveryNRecords(u64),
    /// After this many buffered bytes.
    EveryNBytes(u64),
}

impl FlushPolicy {
    pub fn is_auto(&self) -> bool {
        !matches!(self, FlushPolicy::Manual)
    }
}

/// Streaming options of a file writer.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingConfig {
    pub policy: FlushPolicy,
    /// Size of the I/O buffer in front of the file.
    pub io_buffer: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            policy: FlushPolicy::EveryNBytes(DEFAULT_FLUSH_BYTES),
            io_buffer: 1 << 20,
        }
    }
}

impl StreamingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn every_n_records(n: u64) -> Self {
        Self {
            policy: FlushPolicy::EveryNRecords(n),
            ..Self::default()
        }
    }

    pub fn every_n_bytes(n: u64) -> Self {
        Self {
            policy: FlushPolicy::EveryNBytes(n),
            ..Self::default()
        }
    }

    pub fn manual() -> Self {
        Self {
            policy: FlushPolicy::Manual,
            ..Self::default()
        }
    }
}

/// Counters driving the flush decision.
#[derive(Debug, Default)]
pub(super) struct FlushState {
    pub records_since_flush: u64,
    pub bytes_since_flush: u64,
    pub total_records: u64,
    pub total_bytes: u64,
    pub flush_count: u64,
}

impl FlushState {
    pub fn record_write(&mut self, records: u64, bytes: u64) {
        self.records_since_flush += records;
        self.bytes_since_flush += bytes;
        self.total_records += records;
        self.total_bytes += bytes;
    }

    pub fn should_flush(&self, policy: &FlushPolicy) -> bool {
        match *policy {
            FlushPolicy::Manual => false,
            FlushPolicy::EveryNRecords(n) => self.records_since_flush >= n,
            FlushPolicy::EveryNBytes(n) => self.bytes_since_flush >= n,
        }
    }

    pub fn on_flush(&mut self) {
        self.records_since_flush = 0;
        self.bytes_since_flush = 0;
        self.flush_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_never_triggers() {
        let mut state = FlushState::default();
        state.record_write(1_000_000, 1 << 30);
        assert!(!state.should_flush(&FlushPolicy::Manual));
        assert!(!FlushPolicy::Manual.is_auto());
    }

    #[test]
    fn thresholds_trigger_and_reset() {
        let mut state = FlushState::default();
        state.record_write(99, 990);
        assert!(!state.should_flush(&FlushPolicy::EveryNRecords(100)));
        state.record_write(1, 10);
        assert!(state.should_flush(&FlushPolicy::EveryNRecords(100)));
        assert!(state.should_flush(&FlushPolicy::EveryNBytes(1000)));
        assert!(!state.should_flush(&FlushPolicy::EveryNBytes(1001)));

        state.on_flush();
        assert_eq!(state.records_since_flush, 0);
        assert_eq!(state.total_records, 100);
        assert_eq!(state.total_bytes, 1000);
        assert_eq!(state.flush_count, 1);
    }

    #[test]
    fn default_config_flushes_by_size() {
        assert_eq!(
            StreamingConfig::default().policy,
            FlushPolicy::EveryNBytes(DEFAULT_FLUSH_BYTES)
        );
        assert_eq!(StreamingConfig::manual().policy, FlushPolicy::Manual);
    }
}
