//! Reservation lifecycle status.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status of a reservation header.
///
/// Any status may follow any other: the workflow does not restrict
/// transitions, and cancelling does not return stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Pending review by staff.
    #[default]
    EnAttente,
    /// Accepted by staff.
    Validee,
    /// Refused by staff.
    Refusee,
    /// Ready for collection.
    Prete,
    /// Collected by the client.
    Recuperee,
    /// Cancelled.
    Annulee,
}

impl ReservationStatus {
    /// Every accepted status, in lifecycle order.
    pub const ALL: [ReservationStatus; 6] = [
        ReservationStatus::EnAttente,
        ReservationStatus::Validee,
        ReservationStatus::Refusee,
        ReservationStatus::Prete,
        ReservationStatus::Recuperee,
        ReservationStatus::Annulee,
    ];

    /// Returns the persisted tag for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::EnAttente => "EN_ATTENTE",
            ReservationStatus::Validee => "VALIDEE",
            ReservationStatus::Refusee => "REFUSEE",
            ReservationStatus::Prete => "PRETE",
            ReservationStatus::Recuperee => "RECUPEREE",
            ReservationStatus::Annulee => "ANNULEE",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status tag is not one of the accepted values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown reservation status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ReservationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_persisted_tag() {
        for status in ReservationStatus::ALL {
            assert_eq!(status.as_str().parse::<ReservationStatus>(), Ok(status));
        }
    }

    #[test]
    fn rejects_unknown_and_lowercase_tags() {
        assert!("SHIPPED".parse::<ReservationStatus>().is_err());
        assert!("validee".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn serde_matches_persisted_tags() {
        let json = serde_json::to_string(&ReservationStatus::Recuperee).unwrap();
        assert_eq!(json, "\"RECUPEREE\"");
        let parsed: ReservationStatus = serde_json::from_str("\"EN_ATTENTE\"").unwrap();
        assert_eq!(parsed, ReservationStatus::EnAttente);
    }

    #[test]
    fn default_is_pending() {
        assert_eq!(ReservationStatus::default(), ReservationStatus::EnAttente);
    }
}
