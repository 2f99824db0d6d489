//! Contracts for the external geocoding collaborators. The wizard only
//! depends on these traits; concrete HTTP clients live outside the core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::perimeter::Coordinate;

/// Structured result of a forward or reverse lookup. Forward lookups may
/// leave any of the textual fields unset depending on how detailed the
/// match was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCandidate {
    pub coordinate: Coordinate,
    pub street: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

impl GeocodeCandidate {
    /// A candidate detailed enough to auto-fill the address step: it names
    /// a street-level component and carries a postal code.
    pub fn is_street_level(&self) -> bool {
        self.street.is_some() && self.postal_code.is_some()
    }
}

/// Transport-level lookup failure. Deliberately distinct from a geofence
/// rejection; callers surface this as "try again", never as "outside the
/// coverage area".
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoding service unavailable: {0}")]
    Unavailable(String),
    #[error("geocoding request timed out")]
    Timeout,
}

#[async_trait]
pub trait ForwardGeocoder: Send + Sync {
    /// Free-text address search returning zero or more candidates.
    async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError>;
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Resolves structured address fields for a coordinate, if any.
    async fn reverse(&self, coordinate: Coordinate)
        -> Result<Option<GeocodeCandidate>, GeocodeError>;
}

/// Picks the first acceptably detailed candidate, falling back to the best
/// available one (the provider returns results ranked by relevance).
pub fn select_candidate(candidates: Vec<GeocodeCandidate>) -> Option<GeocodeCandidate> {
    if let Some(detailed) = candidates.iter().find(|c| c.is_street_level()) {
        return Some(detailed.clone());
    }
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(street: Option<&str>, postal: Option<&str>) -> GeocodeCandidate {
        GeocodeCandidate {
            coordinate: Coordinate {
                latitude: -23.58,
                longitude: -46.595,
            },
            street: street.map(str::to_string),
            neighborhood: None,
            city: Some("São Paulo".to_string()),
            state: Some("SP".to_string()),
            postal_code: postal.map(str::to_string),
        }
    }

    #[test]
    fn prefers_street_level_candidates() {
        let selected = select_candidate(vec![
            candidate(None, None),
            candidate(Some("Avenida do Estado"), Some("04214-000")),
        ])
        .expect("candidate selected");
        assert_eq!(selected.street.as_deref(), Some("Avenida do Estado"));
    }

    #[test]
    fn falls_back_to_best_available() {
        let selected =
            select_candidate(vec![candidate(None, None), candidate(Some("Rua A"), None)])
                .expect("candidate selected");
        assert!(selected.street.is_none());
    }

    #[test]
    fn empty_results_select_nothing() {
        assert!(select_candidate(Vec::new()).is_none());
    }
}
