//! Percentage-based migration gate
//!
//! The gate routes traffic between two storage backends for the same
//! logical entity. Each named switch carries a target percentage; a subject
//! id is inside the rollout iff `id % 100 < percent`, so the same subject
//! always routes consistently at a fixed percent value. Lookups are
//! lock-free reads of a small routing table; toggling a switch takes
//! effect for the next lookup, not retroactively.

use dashmap::DashMap;
use plume_core::UserId;

/// Configuration of one migration switch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GateConfig {
    /// Percentage of subjects routed to the new backend, 0..=100
    pub percent: u8,
    /// Human-readable description of the rollout
    pub description: String,
}

/// Routing table of named percentage switches
#[derive(Debug, Default)]
pub struct MigrationGate {
    switches: DashMap<String, GateConfig>,
}

impl MigrationGate {
    /// Create a gate with every switch at 0 percent
    pub fn new() -> Self {
        Self::default()
    }

    /// Current configuration of a switch
    ///
    /// Unknown switches read as percent 0 with an empty description.
    pub fn get(&self, switch: &str) -> GateConfig {
        self.switches
            .get(switch)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Set a switch's rollout percentage (clamped to 100)
    pub fn set_percent(&self, switch: &str, percent: u8) {
        let mut entry = self.switches.entry(switch.to_string()).or_default();
        entry.percent = percent.min(100);
    }

    /// Set a switch's description
    pub fn set_description(&self, switch: &str, description: &str) {
        let mut entry = self.switches.entry(switch.to_string()).or_default();
        entry.description = description.to_string();
    }

    /// Whether the given subject id routes to the new backend
    pub fn in_rollout(&self, switch: &str, id: UserId) -> bool {
        let percent = self.get(switch).percent;
        (id.as_u64() % 100) < u64::from(percent)
    }

    /// Whether the switch is fully open (100 percent)
    pub fn is_fully_open(&self, switch: &str) -> bool {
        self.get(switch).percent == 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_switch_reads_as_closed() {
        let gate = MigrationGate::new();
        let config = gate.get("not-configured");
        assert_eq!(config.percent, 0);
        assert_eq!(config.description, "");
        assert!(!gate.is_fully_open("not-configured"));
        assert!(!gate.in_rollout("not-configured", UserId(1)));
    }

    #[test]
    fn test_partial_rollout_routes_by_id_remainder() {
        let gate = MigrationGate::new();
        gate.set_percent("edges", 20);
        assert_eq!(gate.get("edges").percent, 20);
        assert!(!gate.is_fully_open("edges"));

        assert!(gate.in_rollout("edges", UserId(10)));
        // 101 % 100 == 1 < 20
        assert!(gate.in_rollout("edges", UserId(101)));
        assert!(!gate.in_rollout("edges", UserId(20)));
        assert!(!gate.in_rollout("edges", UserId(21)));
    }

    #[test]
    fn test_fully_open_switch() {
        let gate = MigrationGate::new();
        gate.set_percent("feeds", 100);
        gate.set_description("feeds", "feeds on the column store");
        assert!(gate.is_fully_open("feeds"));
        assert!(gate.in_rollout("feeds", UserId(100)));
        assert_eq!(gate.get("feeds").description, "feeds on the column store");
    }

    #[test]
    fn test_toggling_takes_effect_for_next_lookup() {
        let gate = MigrationGate::new();
        gate.set_percent("edges", 20);
        assert!(!gate.in_rollout("edges", UserId(50)));
        gate.set_percent("edges", 99);
        assert_eq!(gate.get("edges").percent, 99);
        assert!(gate.in_rollout("edges", UserId(50)));
    }

    #[test]
    fn test_routing_is_deterministic() {
        let gate = MigrationGate::new();
        gate.set_percent("edges", 37);
        for id in 0..200u64 {
            let first = gate.in_rollout("edges", UserId(id));
            let second = gate.in_rollout("edges", UserId(id));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_percent_clamped() {
        let gate = MigrationGate::new();
        gate.set_percent("edges", 250);
        assert_eq!(gate.get("edges").percent, 100);
    }
}
