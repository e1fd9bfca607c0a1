// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-field format rules. Each check returns the error text shown to users.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use super::verhoeff;

pub const MISSING_FIELD: &str = "Missing Field";

const AADHAAR_FORMAT: &str = "Invalid Format (expected 12 digits)";
const AADHAAR_CHECKSUM: &str = "Invalid Checksum (Verhoeff)";
const PAN_FORMAT: &str = "Invalid Format (expected: ABCDE1234F)";
const VOTER_ID_FORMAT: &str = "Invalid Format (expected: ABC1234567)";
const DL_FORMAT: &str = "Invalid Format (expected: state code + 11-15 characters)";
const PASSPORT_FORMAT: &str = "Invalid Format (expected: A1234567)";

static PAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("valid PAN regex"));
static VOTER_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}[0-9]{7}$").expect("valid voter ID regex"));
static DRIVING_LICENSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}[0-9A-Z]{11,15}$").expect("valid licence regex"));
static PASSPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][0-9]{7}$").expect("valid passport regex"));

/// Twelve digits (spaces ignored) with a valid Verhoeff check digit.
pub fn validate_aadhaar(value: &str) -> Result<(), &'static str> {
    let digits: String = value.chars().filter(|c| *c != ' ').collect();
    if digits.len() != 12 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AADHAAR_FORMAT);
    }
    if !verhoeff::validate(&digits) {
        return Err(AADHAAR_CHECKSUM);
    }
    Ok(())
}

/// Five letters, four digits, one letter. Case-sensitive.
pub fn validate_pan(value: &str) -> Result<(), &'static str> {
    if PAN.is_match(value) { Ok(()) } else { Err(PAN_FORMAT) }
}

/// EPIC number: three letters and seven digits, any case.
pub fn validate_voter_id(value: &str) -> Result<(), &'static str> {
    if VOTER_ID.is_match(&value.to_uppercase()) {
        Ok(())
    } else {
        Err(VOTER_ID_FORMAT)
    }
}

/// State code plus 11-15 alphanumerics once spaces and hyphens are removed.
pub fn validate_driving_license(value: &str) -> Result<(), &'static str> {
    let clean: String = value
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect::<String>()
        .to_uppercase();
    if DRIVING_LICENSE.is_match(&clean) {
        Ok(())
    } else {
        Err(DL_FORMAT)
    }
}

/// One letter and seven digits, any case.
pub fn validate_passport(value: &str) -> Result<(), &'static str> {
    if PASSPORT.is_match(&value.to_uppercase()) {
        Ok(())
    } else {
        Err(PASSPORT_FORMAT)
    }
}

/// Sanity-check a day/month/year date of birth against `today`.
///
/// Returns a warning when the date cannot be parsed, lies in the future, or
/// falls before 1900.
pub fn check_date_of_birth(value: &str, today: NaiveDate) -> Option<String> {
    let normalized = value.trim().replace(['.', '-'], "/");
    match NaiveDate::parse_from_str(&normalized, "%d/%m/%Y") {
        Err(_) => Some(format!("Unparsable date of birth: {value}")),
        Ok(dob) if dob > today => Some(format!("Date of birth is in the future: {value}")),
        Ok(dob) if dob.year() < 1900 => Some(format!("Date of birth is before 1900: {value}")),
        Ok(_) => None,
    }
}
