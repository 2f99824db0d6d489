use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use urbanvote::workflows::enrollment::geocode::{
    ForwardGeocoder, GeocodeCandidate, GeocodeError, ReverseGeocoder,
};
use urbanvote::workflows::enrollment::perimeter::Coordinate;
use urbanvote::workflows::enrollment::service::{
    EnrollmentRecord, EnrollmentRegistry, EnrollmentStatus, RegistryError,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Registry keyed by the normalized national id. Backs both the running
/// service and the CLI demo; a database-backed registry replaces it in
/// deployment.
#[derive(Default, Clone)]
pub(crate) struct InMemoryEnrollmentRegistry {
    records: Arc<Mutex<HashMap<String, EnrollmentRecord>>>,
}

impl EnrollmentRegistry for InMemoryEnrollmentRegistry {
    fn insert(&self, record: EnrollmentRecord) -> Result<EnrollmentRecord, RegistryError> {
        let mut guard = self.records.lock().expect("registry mutex poisoned");
        let key = record.draft.personal.national_id.clone();
        if guard.contains_key(&key) {
            return Err(RegistryError::Conflict);
        }
        guard.insert(key, record.clone());
        Ok(record)
    }

    fn fetch_by_national_id(
        &self,
        national_id: &str,
    ) -> Result<Option<EnrollmentRecord>, RegistryError> {
        let guard = self.records.lock().expect("registry mutex poisoned");
        Ok(guard.get(national_id).cloned())
    }

    fn fetch_by_email(&self, email: &str) -> Result<Option<EnrollmentRecord>, RegistryError> {
        let guard = self.records.lock().expect("registry mutex poisoned");
        Ok(guard
            .values()
            .find(|record| record.draft.personal.email == email)
            .cloned())
    }

    fn update_status(
        &self,
        national_id: &str,
        status: EnrollmentStatus,
    ) -> Result<(), RegistryError> {
        let mut guard = self.records.lock().expect("registry mutex poisoned");
        match guard.get_mut(national_id) {
            Some(record) => {
                record.status = status;
                Ok(())
            }
            None => Err(RegistryError::NotFound),
        }
    }
}

/// Offline geocoder for the CLI demo. Reverse lookups echo the clicked
/// coordinate with a canned street profile; forward lookups resolve to the
/// configured anchor coordinate.
#[derive(Debug, Clone)]
pub(crate) struct CannedGeocoder {
    anchor: Coordinate,
}

impl CannedGeocoder {
    pub(crate) fn anchored_at(anchor: Coordinate) -> Self {
        Self { anchor }
    }

    fn candidate(&self, coordinate: Coordinate) -> GeocodeCandidate {
        GeocodeCandidate {
            coordinate,
            street: Some("Avenida do Estado".to_string()),
            neighborhood: Some("Ipiranga".to_string()),
            city: Some("São Paulo".to_string()),
            state: Some("SP".to_string()),
            postal_code: Some("04214-000".to_string()),
        }
    }
}

#[async_trait]
impl ForwardGeocoder for CannedGeocoder {
    async fn search(&self, _query: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
        Ok(vec![self.candidate(self.anchor)])
    }
}

#[async_trait]
impl ReverseGeocoder for CannedGeocoder {
    async fn reverse(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<GeocodeCandidate>, GeocodeError> {
        Ok(Some(self.candidate(coordinate)))
    }
}
