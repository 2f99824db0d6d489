use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::workflows::enrollment::draft::{
    AddressData, Declarations, EnrollmentCategory, EnrollmentDraft, FileSelection, Gender,
    PersonalData,
};
use crate::workflows::enrollment::geocode::{
    ForwardGeocoder, GeocodeCandidate, GeocodeError, ReverseGeocoder,
};
use crate::workflows::enrollment::perimeter::{Coordinate, Perimeter};
use crate::workflows::enrollment::service::{
    EnrollmentRecord, EnrollmentRegistry, EnrollmentService, EnrollmentStatus, RegistryError,
};
use crate::workflows::enrollment::steps::EnrollmentWizard;

/// Simple square perimeter in (lon, lat): corners (0,0) (0,10) (10,10) (10,0).
pub(super) fn square_perimeter() -> Arc<Perimeter> {
    Arc::new(
        Perimeter::new(vec![vec![
            (0.0, 0.0),
            (0.0, 10.0),
            (10.0, 10.0),
            (10.0, 0.0),
        ]])
        .expect("square is valid"),
    )
}

/// Geocoder fake answering every lookup with one configurable candidate.
#[derive(Debug, Clone)]
pub(super) struct StaticGeocoder {
    pub(super) candidate: GeocodeCandidate,
}

impl StaticGeocoder {
    pub(super) fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            candidate: GeocodeCandidate {
                coordinate: Coordinate {
                    latitude,
                    longitude,
                },
                street: Some("Avenida do Estado".to_string()),
                neighborhood: Some("Ipiranga".to_string()),
                city: Some("São Paulo".to_string()),
                state: Some("SP".to_string()),
                postal_code: Some("04214-000".to_string()),
            },
        }
    }
}

#[async_trait]
impl ForwardGeocoder for StaticGeocoder {
    async fn search(&self, _query: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
        Ok(vec![self.candidate.clone()])
    }
}

#[async_trait]
impl ReverseGeocoder for StaticGeocoder {
    async fn reverse(
        &self,
        _coordinate: Coordinate,
    ) -> Result<Option<GeocodeCandidate>, GeocodeError> {
        Ok(Some(self.candidate.clone()))
    }
}

/// Geocoder fake whose lookups never resolve, for exercising cancellation.
#[derive(Debug, Default, Clone)]
pub(super) struct StalledGeocoder;

#[async_trait]
impl ForwardGeocoder for StalledGeocoder {
    async fn search(&self, _query: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
        std::future::pending().await
    }
}

#[async_trait]
impl ReverseGeocoder for StalledGeocoder {
    async fn reverse(
        &self,
        _coordinate: Coordinate,
    ) -> Result<Option<GeocodeCandidate>, GeocodeError> {
        std::future::pending().await
    }
}

/// Geocoder fake that always fails, for exercising the lookup-failure path.
#[derive(Debug, Default, Clone)]
pub(super) struct OfflineGeocoder;

#[async_trait]
impl ForwardGeocoder for OfflineGeocoder {
    async fn search(&self, _query: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
        Err(GeocodeError::Unavailable("connection refused".to_string()))
    }
}

#[async_trait]
impl ReverseGeocoder for OfflineGeocoder {
    async fn reverse(
        &self,
        _coordinate: Coordinate,
    ) -> Result<Option<GeocodeCandidate>, GeocodeError> {
        Err(GeocodeError::Timeout)
    }
}

#[derive(Default)]
pub(super) struct MemoryRegistry {
    records: Mutex<HashMap<String, EnrollmentRecord>>,
}

impl EnrollmentRegistry for MemoryRegistry {
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

pub(super) fn valid_personal() -> PersonalData {
    PersonalData {
        full_name: "Maria da Silva".to_string(),
        social_name: None,
        phone: "(11) 91234-5678".to_string(),
        gender: Some(Gender::Female),
        email: "Maria@Example.com".to_string(),
        national_id: "529.982.247-25".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1990, 4, 12),
        employer: None,
    }
}

pub(super) fn valid_address_at(latitude: f64, longitude: f64) -> AddressData {
    AddressData {
        street: "Avenida do Estado".to_string(),
        number: Some("1200".to_string()),
        complement: None,
        neighborhood: "Ipiranga".to_string(),
        city: "São Paulo".to_string(),
        state: "SP".to_string(),
        postal_code: "04214-000".to_string(),
        coordinate: Some(Coordinate {
            latitude,
            longitude,
        }),
        within_perimeter: None,
    }
}

pub(super) fn accepted_declarations() -> Declarations {
    Declarations {
        identity: true,
        voting: true,
        document: true,
        authorization: true,
        truthfulness: true,
    }
}

pub(super) fn photo() -> FileSelection {
    FileSelection {
        name: "document-front.jpg".to_string(),
        size_bytes: 2 * 1024 * 1024,
        content_type: "image/jpeg".to_string(),
    }
}

/// Draft that passes every step predicate against the square perimeter.
pub(super) fn complete_draft() -> EnrollmentDraft {
    EnrollmentDraft {
        category: Some(EnrollmentCategory::Resident),
        personal: valid_personal(),
        address: valid_address_at(1.0, 1.0),
        files: vec![photo()],
        declarations: accepted_declarations(),
    }
}

pub(super) fn wizard_at(
    latitude: f64,
    longitude: f64,
) -> EnrollmentWizard<StaticGeocoder> {
    EnrollmentWizard::new(
        square_perimeter(),
        Arc::new(StaticGeocoder::at(latitude, longitude)),
    )
}

pub(super) fn build_service() -> (
    Arc<EnrollmentService<MemoryRegistry>>,
    Arc<MemoryRegistry>,
) {
    let registry = Arc::new(MemoryRegistry::default());
    let service = Arc::new(EnrollmentService::new(registry.clone(), square_perimeter()));
    (service, registry)
}
