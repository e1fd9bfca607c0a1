// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Field patterns per document type. The first capture group is the value.

use docverify_core::types::DocumentType;
use once_cell::sync::Lazy;
use regex::Regex;

const DATE: &str = r"\b(\d{2}[-/.]\d{2}[-/.]\d{4})\b";
const GENDER: &str = r"\b(MALE|FEMALE|TRANSGENDER|पुरुष|महिला)\b";

/// A named field and the pattern that finds it.
#[derive(Debug)]
pub struct FieldPattern {
    pub field: &'static str,
    pub regex: Regex,
}

fn table(entries: &[(&'static str, &str)]) -> Vec<FieldPattern> {
    entries
        .iter()
        .map(|&(field, pattern)| FieldPattern {
            field,
            regex: Regex::new(pattern).expect("valid field regex"),
        })
        .collect()
}

static AADHAAR: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    table(&[
        ("aadhaar_number", r"\b(\d{4}\s\d{4}\s\d{4}|\d{12})\b"),
        ("dob", DATE),
        ("gender", GENDER),
    ])
});

static PAN: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    table(&[
        ("pan_number", r"\b([A-Z]{5}\d{4}[A-Z])\b"),
        ("dob", DATE),
        ("name", r"Name\s*[:\-]?\s*\n?([A-Z][A-Z ]+)"),
    ])
});

static VOTER_ID: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    table(&[
        ("voter_id_number", r"\b([A-Z]{3}\d{7})\b"),
        ("age", r"\bAge\s*[:=\-]?\s*(\d{2})\b"),
    ])
});

static DRIVING_LICENSE: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    table(&[
        ("dl_number", r"\b([A-Z]{2}[- ]?\d{2}[- ]?\d{4}[- ]?\d{7})\b"),
        (
            "valid_upto",
            r"(?:Valid till|Valid Upto)\s*[:=\-]?\s*(\d{2}[-/.]\d{2}[-/.]\d{4})",
        ),
    ])
});

static PASSPORT: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    table(&[
        ("passport_number", r"\b([A-Z]\d{7})\b"),
        ("dob", DATE),
        ("surname", r"Surname\s*[:=\-]?\s*([A-Z ]+)"),
        ("given_name", r"Given Name\s*[:=\-]?\s*([A-Z ]+)"),
    ])
});

static BIRTH_CERTIFICATE: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    table(&[
        (
            "registration_number",
            r"(?:Registration|Birth)\s*No\.?\s*[:=\-]?\s*(\d+)",
        ),
        (
            "child_name",
            r"(?:Name of Child|Child's Name)\s*[:=\-]?\s*([A-Za-z ]+)",
        ),
        ("dob", DATE),
        ("place_of_birth", r"Place of Birth\s*[:=\-]?\s*([A-Za-z ,]+)"),
        (
            "father_name",
            r"(?:Father's Name|Name of Father)\s*[:=\-]?\s*([A-Za-z ]+)",
        ),
        (
            "mother_name",
            r"(?:Mother's Name|Name of Mother)\s*[:=\-]?\s*([A-Za-z ]+)",
        ),
    ])
});

/// Patterns for `document_type`; empty for `Unknown`.
pub fn patterns_for(document_type: DocumentType) -> &'static [FieldPattern] {
    match document_type {
        DocumentType::Aadhaar => AADHAAR.as_slice(),
        DocumentType::Pan => PAN.as_slice(),
        DocumentType::VoterId => VOTER_ID.as_slice(),
        DocumentType::DrivingLicense => DRIVING_LICENSE.as_slice(),
        DocumentType::Passport => PASSPORT.as_slice(),
        DocumentType::BirthCertificate => BIRTH_CERTIFICATE.as_slice(),
        DocumentType::Unknown => &[],
    }
}

/// Fields that must be present for the document to be useful.
pub fn critical_fields(document_type: DocumentType) -> &'static [&'static str] {
    match document_type {
        DocumentType::Aadhaar => &["aadhaar_number"],
        DocumentType::Pan => &["pan_number"],
        DocumentType::VoterId => &["voter_id_number"],
        DocumentType::DrivingLicense => &["dl_number"],
        DocumentType::Passport => &["passport_number"],
        DocumentType::BirthCertificate => &["registration_number"],
        DocumentType::Unknown => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_critical_field_has_a_pattern() {
        for document_type in DocumentType::KNOWN {
            let fields: Vec<&str> = patterns_for(document_type).iter().map(|p| p.field).collect();
            for critical in critical_fields(document_type) {
                assert!(fields.contains(critical), "{document_type}: {critical}");
            }
        }
    }

    #[test]
    fn unknown_has_nothing() {
        assert!(patterns_for(DocumentType::Unknown).is_empty());
        assert!(critical_fields(DocumentType::Unknown).is_empty());
    }
}
