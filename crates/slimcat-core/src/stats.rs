use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// What happened to one inbound bridge command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandOutcome {
    /// Parsed and applied (whether or not it changed anything)
    Applied,
    /// Rejected by the parser (missing/malformed field, unknown comment type)
    Dropped,
    /// Unrecognized or missing `type`
    Ignored,
}

/// Counters for bridge commands received
#[derive(Debug, Default, Clone)]
pub struct BridgeStats {
    /// Counts by command type -> outcome -> count
    /// Empty string for command type means the payload had no `type`
    pub by_type: HashMap<String, HashMap<CommandOutcome, u64>>,
    /// Total commands seen
    pub total: u64,
    /// Updates handed to the publisher
    pub published: u64,
}

impl BridgeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, command_type: Option<&str>, outcome: CommandOutcome) {
        self.total += 1;
        *self
            .by_type
            .entry(command_type.unwrap_or("").to_string())
            .or_default()
            .entry(outcome)
            .or_insert(0) += 1;
    }

    pub fn record_published(&mut self) {
        self.published += 1;
    }

    pub fn count(&self, command_type: &str, outcome: CommandOutcome) -> u64 {
        self.by_type
            .get(command_type)
            .and_then(|outcomes| outcomes.get(&outcome))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_for(&self, outcome: CommandOutcome) -> u64 {
        self.by_type
            .values()
            .filter_map(|outcomes| outcomes.get(&outcome))
            .sum()
    }

    /// Command types sorted by total count (descending)
    pub fn types_by_count(&self) -> Vec<(String, u64)> {
        let mut types: Vec<_> = self
            .by_type
            .iter()
            .map(|(t, outcomes)| (t.clone(), outcomes.values().sum::<u64>()))
            .collect();
        types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        types
    }
}

/// Thread-safe wrapper for bridge stats
#[derive(Debug, Clone)]
pub struct SharedBridgeStats {
    inner: Arc<RwLock<BridgeStats>>,
}

impl Default for SharedBridgeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedBridgeStats {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BridgeStats::new())),
        }
    }

    pub fn record(&self, command_type: Option<&str>, outcome: CommandOutcome) {
        if let Ok(mut stats) = self.inner.write() {
            stats.record(command_type, outcome);
        }
    }

    pub fn record_published(&self) {
        if let Ok(mut stats) = self.inner.write() {
            stats.record_published();
        }
    }

    pub fn snapshot(&self) -> BridgeStats {
        self.inner.read().map(|s| s.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_by_type_and_outcome() {
        let stats = SharedBridgeStats::new();
        stats.record(Some("trackadd"), CommandOutcome::Applied);
        stats.record(Some("trackadd"), CommandOutcome::Applied);
        stats.record(Some("comment"), CommandOutcome::Dropped);
        stats.record(None, CommandOutcome::Ignored);
        stats.record_published();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total, 4);
        assert_eq!(snapshot.published, 1);
        assert_eq!(snapshot.count("trackadd", CommandOutcome::Applied), 2);
        assert_eq!(snapshot.count("comment", CommandOutcome::Dropped), 1);
        assert_eq!(snapshot.count("", CommandOutcome::Ignored), 1);
        assert_eq!(snapshot.total_for(CommandOutcome::Applied), 2);
        assert_eq!(snapshot.types_by_count()[0], ("trackadd".to_string(), 2));
    }
}
