use std::collections::HashMap;
use std::path::Path;

use uuid::Uuid;

use crate::model::SeatMap;

#[derive(Debug, thiserror::Error)]
pub enum SeatMapError {
    #[error("no seat map for event {0}")]
    NotFound(Uuid),

    #[error("seat map import failed: {0}")]
    Import(String),
}

/// Read-only lookup from event to seat map. Populated once at startup from
/// configuration/import; free-seating events are simply absent.
pub struct SeatMapRegistry {
    maps: HashMap<Uuid, SeatMap>,
}

impl SeatMapRegistry {
    pub fn new() -> Self {
        Self {
            maps: HashMap::new(),
        }
    }

    pub fn insert(&mut self, event_id: Uuid, map: SeatMap) {
        self.maps.insert(event_id, map);
    }

    /// Load `{ "<event uuid>": SeatMap, ... }` from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SeatMapError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SeatMapError::Import(e.to_string()))?;
        let maps: HashMap<Uuid, SeatMap> =
            serde_json::from_str(&raw).map_err(|e| SeatMapError::Import(e.to_string()))?;
        Ok(Self { maps })
    }

    pub fn get_seat_map(&self, event_id: Uuid) -> Result<&SeatMap, SeatMapError> {
        self.maps
            .get(&event_id)
            .ok_or(SeatMapError::NotFound(event_id))
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

impl Default for SeatMapRegistry {
    fn default() -> Self {
        Self::new()
    }
}
