//! Feature schema
//!
//! The fixed, ordered, versioned set of feature slots every training row
//! and serving-time query conforms to. Training and serving share one
//! schema instance; the version string is derived from the slot layout, so
//! any layout change invalidates previously trained artifacts.

/// Slot type: plain numeric, or an integer-encoded category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Numeric,
    Categorical,
}

/// One named feature slot
#[derive(Debug, Clone)]
pub struct FeatureSlot {
    pub name: &'static str,
    pub kind: SlotKind,
}

/// Ordered feature slots plus a layout-derived version identifier
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    slots: Vec<FeatureSlot>,
    version: String,
}

pub const PLAYER_CODE: &str = "player_code";
pub const TEAM_CODE: &str = "team_code";
pub const OPPONENT_CODE: &str = "opponent_code";
pub const VENUE_CODE: &str = "venue_code";
pub const RUNS_LAST_5_AVG: &str = "runs_last_5_avg";
pub const STRIKE_RATE_LAST_5: &str = "strike_rate_last_5";
pub const BALLS_FACED_LAST_5: &str = "balls_faced_last_5";
pub const VENUE_AVG_RUNS: &str = "venue_avg_runs";
pub const VENUE_AVG_STRIKE_RATE: &str = "venue_avg_strike_rate";
pub const OPPONENT_AVG_RUNS: &str = "opponent_avg_runs";
pub const OPPONENT_AVG_STRIKE_RATE: &str = "opponent_avg_strike_rate";
pub const IS_HOME: &str = "is_home";
pub const BATTING_POSITION: &str = "batting_position";

impl FeatureSchema {
    /// The batting feature layout
    pub fn batting() -> Self {
        FeatureSchema::from_slots(vec![
            FeatureSlot { name: PLAYER_CODE, kind: SlotKind::Categorical },
            FeatureSlot { name: TEAM_CODE, kind: SlotKind::Categorical },
            FeatureSlot { name: OPPONENT_CODE, kind: SlotKind::Categorical },
            FeatureSlot { name: VENUE_CODE, kind: SlotKind::Categorical },
            FeatureSlot { name: RUNS_LAST_5_AVG, kind: SlotKind::Numeric },
            FeatureSlot { name: STRIKE_RATE_LAST_5, kind: SlotKind::Numeric },
            FeatureSlot { name: BALLS_FACED_LAST_5, kind: SlotKind::Numeric },
            FeatureSlot { name: VENUE_AVG_RUNS, kind: SlotKind::Numeric },
            FeatureSlot { name: VENUE_AVG_STRIKE_RATE, kind: SlotKind::Numeric },
            FeatureSlot { name: OPPONENT_AVG_RUNS, kind: SlotKind::Numeric },
            FeatureSlot { name: OPPONENT_AVG_STRIKE_RATE, kind: SlotKind::Numeric },
            FeatureSlot { name: IS_HOME, kind: SlotKind::Numeric },
            FeatureSlot { name: BATTING_POSITION, kind: SlotKind::Numeric },
        ])
    }

    fn from_slots(slots: Vec<FeatureSlot>) -> Self {
        let version = version_of(&slots);
        FeatureSchema { slots, version }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[FeatureSlot] {
        &self.slots
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Index of a slot by name
    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    /// Whether the named slot exists and may be overridden by a caller
    pub fn is_overridable(&self, name: &str) -> bool {
        self.slots
            .iter()
            .any(|s| s.name == name && s.kind == SlotKind::Numeric)
    }
}

/// FNV-1a over the slot layout; stable across runs and builds
fn version_of(slots: &[FeatureSlot]) -> String {
    let mut hash: u64 = 0xcbf29ce484222325;
    for slot in slots {
        for byte in slot.name.bytes().chain([match slot.kind {
            SlotKind::Numeric => b'n',
            SlotKind::Categorical => b'c',
        }]) {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
    }
    format!("fs-{:016x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_lookup() {
        let schema = FeatureSchema::batting();
        assert_eq!(schema.slot_index(PLAYER_CODE), Some(0));
        assert_eq!(schema.slot_index(RUNS_LAST_5_AVG), Some(4));
        assert_eq!(schema.slot_index("nope"), None);
        assert_eq!(schema.len(), 13);
    }

    #[test]
    fn test_version_depends_on_layout() {
        let schema = FeatureSchema::batting();
        let mut slots = schema.slots().to_vec();
        slots.pop();
        let truncated = FeatureSchema::from_slots(slots);

        assert_ne!(schema.version(), truncated.version());
        // Same layout, same version
        assert_eq!(schema.version(), FeatureSchema::batting().version());
    }

    #[test]
    fn test_categorical_slots_not_overridable() {
        let schema = FeatureSchema::batting();
        assert!(schema.is_overridable(RUNS_LAST_5_AVG));
        assert!(schema.is_overridable(BATTING_POSITION));
        assert!(!schema.is_overridable(PLAYER_CODE));
        assert!(!schema.is_overridable("nope"));
    }
}
