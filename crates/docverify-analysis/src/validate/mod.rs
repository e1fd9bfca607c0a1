// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document validation: identifier format/checksum errors plus soft
// cross-field warnings. A failed check is recorded in the result, never
// raised as an error.

pub mod rules;
pub mod verhoeff;

use chrono::NaiveDate;
use docverify_core::types::{DocumentType, FieldMap, ValidationResult};
use tracing::{debug, info, instrument};

use rules::MISSING_FIELD;

type Rule = fn(&str) -> Result<(), &'static str>;

/// The identifier field for `document_type` and the rule it must satisfy.
pub fn identifier_rule(document_type: DocumentType) -> Option<(&'static str, Rule)> {
    match document_type {
        DocumentType::Aadhaar => Some(("aadhaar_number", rules::validate_aadhaar as Rule)),
        DocumentType::Pan => Some(("pan_number", rules::validate_pan as Rule)),
        DocumentType::VoterId => Some(("voter_id_number", rules::validate_voter_id as Rule)),
        DocumentType::DrivingLicense => Some(("dl_number", rules::validate_driving_license as Rule)),
        DocumentType::Passport => Some(("passport_number", rules::validate_passport as Rule)),
        DocumentType::BirthCertificate | DocumentType::Unknown => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Validate against today's local date.
    pub fn validate(&self, fields: &FieldMap, document_type: DocumentType) -> ValidationResult {
        self.validate_on(fields, document_type, chrono::Local::now().date_naive())
    }

    /// Validate, judging dates relative to `today`.
    #[instrument(skip(self, fields), fields(document_type = %document_type, field_count = fields.len()))]
    pub fn validate_on(
        &self,
        fields: &FieldMap,
        document_type: DocumentType,
        today: NaiveDate,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some((field, rule)) = identifier_rule(document_type) {
            match fields.get(field) {
                Some(value) => {
                    if let Err(reason) = rule(value) {
                        debug!(field, reason, "Identifier rejected");
                        result.add_error(field, reason);
                    }
                }
                None => result.add_error(field, MISSING_FIELD),
            }
        }

        if let Some(dob) = fields.get("dob") {
            if let Some(warning) = rules::check_date_of_birth(dob, today) {
                result.add_warning(warning);
            }
        }

        info!(
            is_valid = result.is_valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Validation complete"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    #[test]
    fn valid_pan_card() {
        let result = Validator::new().validate_on(
            &fields(&[("pan_number", "ABCDE1234F"), ("dob", "01/02/1985")]),
            DocumentType::Pan,
            today(),
        );
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn bad_date_warns_without_invalidating() {
        let result = Validator::new().validate_on(
            &fields(&[("pan_number", "ABCDE1234F"), ("dob", "31/02/2020")]),
            DocumentType::Pan,
            today(),
        );
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn bad_date_does_not_rescue_bad_identifier() {
        let result = Validator::new().validate_on(
            &fields(&[("pan_number", "ABCDE1234"), ("dob", "31/02/2020")]),
            DocumentType::Pan,
            today(),
        );
        assert!(!result.is_valid);
        assert_eq!(result.errors["pan_number"], "Invalid Format (expected: ABCDE1234F)");
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn missing_identifier_is_an_error_for_every_identified_type() {
        for document_type in [
            DocumentType::Aadhaar,
            DocumentType::Pan,
            DocumentType::VoterId,
            DocumentType::DrivingLicense,
            DocumentType::Passport,
        ] {
            let result =
                Validator::new().validate_on(&fields(&[("dob", "01/01/2000")]), document_type, today());
            assert!(!result.is_valid, "{document_type}");
            assert_eq!(result.errors.values().next().map(String::as_str), Some(MISSING_FIELD));
        }
    }

    #[test]
    fn birth_certificate_has_no_identifier_rule() {
        let result = Validator::new().validate_on(
            &fields(&[("registration_number", "x"), ("dob", "01/01/2099")]),
            DocumentType::BirthCertificate,
            today(),
        );
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn aadhaar_checksum_failure_is_reported() {
        let result = Validator::new().validate_on(
            &fields(&[("aadhaar_number", "1234 5678 9012")]),
            DocumentType::Aadhaar,
            today(),
        );
        // 123456789012 does not carry a valid check digit.
        assert!(!verhoeff::validate("123456789012"));
        assert_eq!(result.errors["aadhaar_number"], "Invalid Checksum (Verhoeff)");
    }
}
