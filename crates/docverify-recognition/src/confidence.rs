// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Heuristic confidence for engines that only report plain text.

/// Score recognised text in `[0, 1]` from surface features.
///
/// Starts at 0.5; longer text, digits and capitals push it up, a high share
/// of punctuation/symbol noise pulls it down. Empty text scores 0.
pub fn estimate_confidence(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }

    let length = text.chars().count();
    let mut confidence = 0.5;

    if length > 100 {
        confidence += 0.1;
    }
    if length > 500 {
        confidence += 0.1;
    }
    if text.chars().any(char::is_numeric) {
        confidence += 0.1;
    }
    if text.chars().any(char::is_uppercase) {
        confidence += 0.05;
    }

    let special = text
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count();
    if special as f64 / length as f64 > 0.3 {
        confidence -= 0.2;
    }

    f64::clamp(confidence, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero() {
        assert_eq!(estimate_confidence(""), 0.0);
    }

    #[test]
    fn short_lowercase_text_is_base() {
        assert_eq!(estimate_confidence("hello world"), 0.5);
    }

    #[test]
    fn features_accumulate() {
        // Digits and capitals: 0.5 + 0.1 + 0.05.
        let conf = estimate_confidence("PAN ABCDE1234F");
        assert!((conf - 0.65).abs() < 1e-12);

        let long = format!("GOVERNMENT OF INDIA 1234 {}", "a".repeat(600));
        let conf = estimate_confidence(&long);
        assert!((conf - 0.85).abs() < 1e-12);
    }

    #[test]
    fn symbol_noise_is_penalized() {
        // 6 of 8 characters are symbols.
        let conf = estimate_confidence("@@##$$ab");
        assert!((conf - 0.3).abs() < 1e-12);
    }

    #[test]
    fn always_within_unit_interval() {
        let long = "X9 ".repeat(400);
        for text in ["!!!!", "~", "A1", long.as_str()] {
            let conf = estimate_confidence(text);
            assert!((0.0..=1.0).contains(&conf), "{text:?} -> {conf}");
        }
    }
}
