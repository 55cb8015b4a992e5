use std::collections::VecDeque;
use std::time::Instant;

use serde_json::{Map, Value};

/// One telemetry message as received, stamped with its arrival time.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    pub received_at: Instant,
    pub message: Map<String, Value>,
}

/// Bounded telemetry history in arrival order.
///
/// When full, pushing a record evicts the oldest one.
#[derive(Debug, Clone)]
pub struct TelemetryLog {
    records: VecDeque<TelemetryRecord>,
    capacity: usize,
}

impl TelemetryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: TelemetryRecord) {
        self.records.push_back(record);
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TelemetryRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.records.back()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(seq: usize, at: Instant) -> TelemetryRecord {
        let mut message = Map::new();
        message.insert("T".to_string(), json!("Motors"));
        message.insert("seq".to_string(), json!(seq));
        TelemetryRecord {
            received_at: at,
            message,
        }
    }

    #[test]
    fn keeps_everything_below_capacity() {
        let now = Instant::now();
        let mut log = TelemetryLog::new(4);
        for seq in 0..3 {
            log.push(record(seq, now));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.latest().unwrap().message["seq"], 2);
    }

    #[test]
    fn evicts_oldest_first() {
        let now = Instant::now();
        let mut log = TelemetryLog::new(3);
        for seq in 0..10 {
            log.push(record(seq, now));
        }

        let kept: Vec<_> = log.iter().map(|r| r.message["seq"].clone()).collect();
        assert_eq!(kept, vec![json!(7), json!(8), json!(9)]);
        assert_eq!(log.capacity(), 3);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut log = TelemetryLog::new(0);
        log.push(record(0, Instant::now()));
        assert!(log.is_empty());
        assert!(log.latest().is_none());
    }
}
