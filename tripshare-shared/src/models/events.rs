use uuid::Uuid;

/// Emitted after a join commits. Carries the ledger as it stood after the join.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct SeatUpdateEvent {
    pub trip_id: Uuid,
    pub user_id: String,
    pub max_capacity: i32,
    pub people_already: i32,
    pub people_needed: i32,
    pub occurred_at: i64,
}

impl SeatUpdateEvent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_update_serializes_flat() {
        let event = SeatUpdateEvent {
            trip_id: Uuid::nil(),
            user_id: "rider-1".to_string(),
            max_capacity: 4,
            people_already: 3,
            people_needed: 1,
            occurred_at: 1_700_000_000,
        };

        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["people_needed"], 1);
        assert_eq!(value["user_id"], "rider-1");
    }
}
