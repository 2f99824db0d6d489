use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::perimeter::Coordinate;

/// How the citizen participates in the program area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentCategory {
    Resident,
    Worker,
}

impl EnrollmentCategory {
    pub const fn label(self) -> &'static str {
        match self {
            EnrollmentCategory::Resident => "resident",
            EnrollmentCategory::Worker => "worker",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Personal data collected on the third step. `employer` is required only
/// for the worker category; the validator owns that rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalData {
    pub full_name: String,
    pub social_name: Option<String>,
    pub phone: String,
    pub gender: Option<Gender>,
    pub email: String,
    pub national_id: String,
    pub birth_date: Option<NaiveDate>,
    pub employer: Option<String>,
}

/// Address subrecord. Textual fields must be empty whenever `coordinate`
/// is known to lie outside the perimeter; [`AddressData::clear_text_fields`]
/// enforces that while preserving the coordinate so the map marker keeps
/// showing where the rejected point was.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressData {
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub coordinate: Option<Coordinate>,
    pub within_perimeter: Option<bool>,
}

impl AddressData {
    pub fn clear_text_fields(&mut self) {
        self.street.clear();
        self.number = None;
        self.complement = None;
        self.neighborhood.clear();
        self.city.clear();
        self.state.clear();
        self.postal_code.clear();
    }

    pub fn has_required_text_fields(&self) -> bool {
        !self.street.trim().is_empty()
            && !self.neighborhood.trim().is_empty()
            && !self.city.trim().is_empty()
            && !self.state.trim().is_empty()
            && !self.postal_code.trim().is_empty()
    }
}

/// Metadata for a selected upload; storage itself belongs to the file
/// collaborator, the wizard only checks count, size, and type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSelection {
    pub name: String,
    pub size_bytes: u64,
    pub content_type: String,
}

/// Five independent acknowledgments collected on the final step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declarations {
    pub identity: bool,
    pub voting: bool,
    pub document: bool,
    pub authorization: bool,
    pub truthfulness: bool,
}

impl Declarations {
    pub fn all_accepted(&self) -> bool {
        self.identity && self.voting && self.document && self.authorization && self.truthfulness
    }
}

/// In-progress enrollment record, private to one wizard session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentDraft {
    pub category: Option<EnrollmentCategory>,
    pub personal: PersonalData,
    pub address: AddressData,
    pub files: Vec<FileSelection>,
    pub declarations: Declarations,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clearing_text_fields_preserves_coordinate() {
        let mut address = AddressData {
            street: "Avenida do Estado".to_string(),
            number: Some("1200".to_string()),
            neighborhood: "Ipiranga".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            postal_code: "04214-000".to_string(),
            coordinate: Some(Coordinate {
                latitude: -23.58,
                longitude: -46.595,
            }),
            ..AddressData::default()
        };

        address.clear_text_fields();

        assert!(!address.has_required_text_fields());
        assert!(address.street.is_empty());
        assert!(address.number.is_none());
        assert!(address.coordinate.is_some());
    }

    #[test]
    fn declarations_require_all_five() {
        let mut declarations = Declarations {
            identity: true,
            voting: true,
            document: true,
            authorization: true,
            truthfulness: false,
        };
        assert!(!declarations.all_accepted());

        declarations.truthfulness = true;
        assert!(declarations.all_accepted());
    }
}
