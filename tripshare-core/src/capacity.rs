use serde::{Deserialize, Serialize};

/// Seat count assumed when the vehicle descriptor matches nothing in the table.
pub const FALLBACK_CAPACITY: i32 = 4;

/// Ordered lookup table. The first keyword found in the descriptor wins, so
/// "Minibus" resolves as a bus.
const VEHICLE_CAPACITIES: [(&str, i32); 4] = [("bus", 15), ("suv", 7), ("mini", 4), ("bike", 1)];

/// Default maximum seat capacity for a free-text vehicle descriptor.
///
/// This is the only place a vehicle-derived capacity is computed. Trip
/// creation, listing, joining and reconciliation all go through it.
pub fn resolve_default_capacity(vehicle: &str) -> i32 {
    let vehicle = vehicle.to_lowercase();
    VEHICLE_CAPACITIES
        .iter()
        .find(|(keyword, _)| vehicle.contains(keyword))
        .map(|(_, capacity)| *capacity)
        .unwrap_or(FALLBACK_CAPACITY)
}

/// Which capacity reconciliation writes back for a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Keep a capacity the host set explicitly; only vehicle-derived trips
    /// are recomputed from the table.
    #[default]
    PreserveExplicit,
    /// Always recompute from the vehicle table, discarding explicit capacities.
    VehicleDefault,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_table() {
        assert_eq!(resolve_default_capacity("City Bus"), 15);
        assert_eq!(resolve_default_capacity("Toyota SUV"), 7);
        assert_eq!(resolve_default_capacity("Mini Van"), 4);
        assert_eq!(resolve_default_capacity("Royal Enfield bike"), 1);
        assert_eq!(resolve_default_capacity("Sedan"), 4);
        assert_eq!(resolve_default_capacity(""), 4);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(resolve_default_capacity("BUS"), 15);
        assert_eq!(resolve_default_capacity("suv"), 7);
        assert_eq!(resolve_default_capacity("MiNi cooper"), 4);
        assert_eq!(resolve_default_capacity("BiKe"), 1);
    }

    #[test]
    fn test_first_match_wins() {
        // "minibus" contains both "mini" and "bus"; bus is checked first
        assert_eq!(resolve_default_capacity("Minibus"), 15);
        assert_eq!(resolve_default_capacity("SUV with bike rack"), 7);
        assert_eq!(resolve_default_capacity("mini bike"), 4);
    }

    #[test]
    fn test_policy_parses_snake_case() {
        let policy: CapacityPolicy = serde_json::from_str("\"vehicle_default\"").unwrap();
        assert_eq!(policy, CapacityPolicy::VehicleDefault);
        assert_eq!(CapacityPolicy::default(), CapacityPolicy::PreserveExplicit);
    }
}
