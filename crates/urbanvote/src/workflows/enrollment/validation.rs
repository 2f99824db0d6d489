//! Field-level validation collaborator. The step machine orchestrates step
//! sequencing and the geofence condition; every required/format rule lives
//! here so deployments can swap the rule set without touching the machine.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;

use super::draft::{AddressData, EnrollmentCategory, EnrollmentDraft, FileSelection};

const MAX_FILES: usize = 5;
const MAX_TOTAL_FILE_BYTES: u64 = 30 * 1024 * 1024;
const MIN_AGE_YEARS: i32 = 16;
const MAX_AGE_YEARS: i32 = 120;

const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/zip",
    "application/x-zip-compressed",
];

const ALLOWED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".zip"];

/// Single field-scoped failure, recoverable by correcting the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Collected validation failures for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Per-step field validation owned by the form collaborator.
pub trait FormValidator: Send + Sync {
    fn validate_category(&self, draft: &EnrollmentDraft) -> Result<(), FieldErrors>;
    fn validate_address_fields(&self, address: &AddressData) -> Result<(), FieldErrors>;
    fn validate_personal(&self, draft: &EnrollmentDraft, today: NaiveDate)
        -> Result<(), FieldErrors>;
    fn validate_files(&self, files: &[FileSelection]) -> Result<(), FieldErrors>;
}

/// Rule set matching the public enrollment form.
pub struct StandardFormValidator {
    name: Regex,
    phone: Regex,
    email: Regex,
    state: Regex,
    postal_code: Regex,
}

impl Default for StandardFormValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardFormValidator {
    pub fn new() -> Self {
        Self {
            name: Regex::new(r"^[A-Za-zÀ-ÿ\s]+$").expect("name pattern compiles"),
            phone: Regex::new(r"^\(\d{2}\) \d{4,5}-\d{4}$").expect("phone pattern compiles"),
            email: Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"),
            state: Regex::new(r"^[A-Z]{2}$").expect("state pattern compiles"),
            postal_code: Regex::new(r"^\d{5}-?\d{3}$").expect("postal code pattern compiles"),
        }
    }
}

impl FormValidator for StandardFormValidator {
    fn validate_category(&self, draft: &EnrollmentDraft) -> Result<(), FieldErrors> {
        let mut errors = Vec::new();
        if draft.category.is_none() {
            errors.push(FieldError {
                field: "category",
                message: "select how you participate".to_string(),
            });
        }
        into_result(errors)
    }

    fn validate_address_fields(&self, address: &AddressData) -> Result<(), FieldErrors> {
        let mut errors = Vec::new();

        let street = address.street.trim();
        if street.len() < 5 || street.len() > 200 {
            errors.push(FieldError {
                field: "address.street",
                message: "street must have between 5 and 200 characters".to_string(),
            });
        }
        if address.neighborhood.trim().len() < 2 {
            errors.push(FieldError {
                field: "address.neighborhood",
                message: "neighborhood must have at least 2 characters".to_string(),
            });
        }
        if address.city.trim().len() < 2 {
            errors.push(FieldError {
                field: "address.city",
                message: "city must have at least 2 characters".to_string(),
            });
        }
        if !self.state.is_match(address.state.trim()) {
            errors.push(FieldError {
                field: "address.state",
                message: "state must be a two-letter code (e.g. SP)".to_string(),
            });
        }
        if !self.postal_code.is_match(address.postal_code.trim()) {
            errors.push(FieldError {
                field: "address.postal_code",
                message: "postal code must match 00000-000".to_string(),
            });
        }

        into_result(errors)
    }

    fn validate_personal(
        &self,
        draft: &EnrollmentDraft,
        today: NaiveDate,
    ) -> Result<(), FieldErrors> {
        let personal = &draft.personal;
        let mut errors = Vec::new();

        let name = personal.full_name.trim();
        if name.len() < 2 || name.len() > 100 || !self.name.is_match(name) {
            errors.push(FieldError {
                field: "personal.full_name",
                message: "name must be 2-100 letters and spaces".to_string(),
            });
        }

        if let Some(social) = &personal.social_name {
            if social.len() > 100 || (!social.is_empty() && !self.name.is_match(social)) {
                errors.push(FieldError {
                    field: "personal.social_name",
                    message: "social name must contain only letters and spaces".to_string(),
                });
            }
        }

        if !self.phone.is_match(personal.phone.trim()) {
            errors.push(FieldError {
                field: "personal.phone",
                message: "phone must match (00) 00000-0000".to_string(),
            });
        }

        if personal.gender.is_none() {
            errors.push(FieldError {
                field: "personal.gender",
                message: "select a gender".to_string(),
            });
        }

        let email = personal.email.trim();
        if email.len() > 100 || !self.email.is_match(email) {
            errors.push(FieldError {
                field: "personal.email",
                message: "invalid email".to_string(),
            });
        }

        if !national_id_checksum_ok(&personal.national_id) {
            errors.push(FieldError {
                field: "personal.national_id",
                message: "invalid national id".to_string(),
            });
        }

        match personal.birth_date {
            Some(birth_date) => {
                let age = age_on(birth_date, today);
                if !(MIN_AGE_YEARS..=MAX_AGE_YEARS).contains(&age) {
                    errors.push(FieldError {
                        field: "personal.birth_date",
                        message: format!("you must be at least {MIN_AGE_YEARS} years old"),
                    });
                }
            }
            None => errors.push(FieldError {
                field: "personal.birth_date",
                message: "birth date is required".to_string(),
            }),
        }

        if draft.category == Some(EnrollmentCategory::Worker) {
            let employer_ok = personal
                .employer
                .as_deref()
                .map(|employer| {
                    let employer = employer.trim();
                    !employer.is_empty() && employer.len() <= 200
                })
                .unwrap_or(false);
            if !employer_ok {
                errors.push(FieldError {
                    field: "personal.employer",
                    message: "employer is required for workers".to_string(),
                });
            }
        }

        into_result(errors)
    }

    fn validate_files(&self, files: &[FileSelection]) -> Result<(), FieldErrors> {
        let mut errors = Vec::new();

        if files.is_empty() {
            errors.push(FieldError {
                field: "files",
                message: "select at least one file".to_string(),
            });
        }
        if files.len() > MAX_FILES {
            errors.push(FieldError {
                field: "files",
                message: format!("at most {MAX_FILES} files are allowed"),
            });
        }

        let total: u64 = files.iter().map(|file| file.size_bytes).sum();
        if total > MAX_TOTAL_FILE_BYTES {
            errors.push(FieldError {
                field: "files",
                message: "total file size may not exceed 30 MiB".to_string(),
            });
        }

        for file in files {
            let name = file.name.to_lowercase();
            let type_ok = ALLOWED_CONTENT_TYPES.contains(&file.content_type.as_str())
                || ALLOWED_EXTENSIONS.iter().any(|ext| name.ends_with(ext));
            if !type_ok {
                errors.push(FieldError {
                    field: "files",
                    message: format!("'{}' is not an allowed image or zip file", file.name),
                });
            }
        }

        into_result(errors)
    }
}

fn into_result(errors: Vec<FieldError>) -> Result<(), FieldErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(FieldErrors(errors))
    }
}

fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/// Strips punctuation from a national id, keeping digits only.
pub fn normalize_national_id(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Mod-11 check-digit verification over the 11-digit national id. Repeated
/// single-digit sequences are rejected even though their check digits match.
pub fn national_id_checksum_ok(raw: &str) -> bool {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 {
        return false;
    }
    if digits.windows(2).all(|pair| pair[0] == pair[1]) {
        return false;
    }

    let check_digit = |take: usize| -> u32 {
        let sum: u32 = digits[..take]
            .iter()
            .enumerate()
            .map(|(i, digit)| digit * (take as u32 + 1 - i as u32))
            .sum();
        let rest = 11 - (sum % 11);
        if rest >= 10 {
            0
        } else {
            rest
        }
    };

    check_digit(9) == digits[9] && check_digit(10) == digits[10]
}
