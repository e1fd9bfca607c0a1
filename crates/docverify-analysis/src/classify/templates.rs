// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Keyword and layout signatures for each supported document type.

use docverify_core::types::DocumentType;
use once_cell::sync::Lazy;
use regex::Regex;

/// What a document of one type tends to contain.
#[derive(Debug)]
pub struct DocumentTemplate {
    pub document_type: DocumentType,
    /// Lower-case phrases, matched as substrings of the lower-cased text.
    pub keywords: &'static [&'static str],
    /// Identifier layouts, matched against the original text.
    pub patterns: Vec<Regex>,
    /// Keyword hits below this count contribute nothing.
    pub min_keywords: usize,
}

impl DocumentTemplate {
    fn new(
        document_type: DocumentType,
        keywords: &'static [&'static str],
        patterns: &[&str],
    ) -> Self {
        Self {
            document_type,
            keywords,
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("valid template regex"))
                .collect(),
            min_keywords: 2,
        }
    }
}

/// Every template, in scoring order (ties keep the earlier type).
pub static TEMPLATES: Lazy<Vec<DocumentTemplate>> = Lazy::new(|| {
    vec![
        DocumentTemplate::new(
            DocumentType::Aadhaar,
            &[
                "government of india",
                "mera aadhaar",
                "unique identification",
                "father",
                "dob",
                "male",
                "female",
                "yob",
            ],
            &[r"\d{4}\s\d{4}\s\d{4}", r"\d{12}"],
        ),
        DocumentTemplate::new(
            DocumentType::Pan,
            &[
                "income tax department",
                "govt of india",
                "permanent account number",
                "signature",
                "date of birth",
            ],
            &[r"[A-Z]{5}[0-9]{4}[A-Z]{1}"],
        ),
        DocumentTemplate::new(
            DocumentType::VoterId,
            &[
                "election commission of india",
                "identity card",
                "elector's name",
                "sex",
                "father's name",
            ],
            &[r"[A-Z]{3}[0-9]{7}"],
        ),
        DocumentTemplate::new(
            DocumentType::DrivingLicense,
            &[
                "driving licence",
                "union of india",
                "transport department",
                "valid till",
                "authorization to drive",
            ],
            &[r"[A-Z]{2}[0-9]{2}\s\d{11}", r"[A-Z]{2}-\d{13}"],
        ),
        DocumentTemplate::new(
            DocumentType::Passport,
            &[
                "republic of india",
                "passport",
                "nationality",
                "place of issue",
                "surname",
                "given name",
            ],
            &[r"\b[A-Z][0-9]{7}\b"],
        ),
        DocumentTemplate::new(
            DocumentType::BirthCertificate,
            &[
                "birth certificate",
                "registration",
                "place of birth",
                "name of mother",
                "name of father",
                "date of registration",
            ],
            &[r"(?i)(?:registration|birth)\s*no\.?\s*[:=\-]?\s*\d+"],
        ),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_type_has_one_template_in_order() {
        let order: Vec<DocumentType> = TEMPLATES.iter().map(|t| t.document_type).collect();
        assert_eq!(order, DocumentType::KNOWN.to_vec());
    }

    #[test]
    fn keywords_are_lower_case() {
        for template in TEMPLATES.iter() {
            for keyword in template.keywords {
                assert_eq!(*keyword, keyword.to_lowercase());
            }
        }
    }
}
