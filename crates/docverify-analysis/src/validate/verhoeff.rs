// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verhoeff check digit (dihedral group D5), as used by Aadhaar numbers.
//
// Detects every single-digit error and every adjacent transposition.

/// Multiplication table of D5.
const D: [[u8; 10]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 2, 3, 4, 0, 6, 7, 8, 9, 5],
    [2, 3, 4, 0, 1, 7, 8, 9, 5, 6],
    [3, 4, 0, 1, 2, 8, 9, 5, 6, 7],
    [4, 0, 1, 2, 3, 9, 5, 6, 7, 8],
    [5, 9, 8, 7, 6, 0, 4, 3, 2, 1],
    [6, 5, 9, 8, 7, 1, 0, 4, 3, 2],
    [7, 6, 5, 9, 8, 2, 1, 0, 4, 3],
    [8, 7, 6, 5, 9, 3, 2, 1, 0, 4],
    [9, 8, 7, 6, 5, 4, 3, 2, 1, 0],
];

/// Position-dependent permutations.
const P: [[u8; 10]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 5, 7, 6, 2, 8, 3, 0, 9, 4],
    [5, 8, 0, 3, 7, 9, 6, 1, 4, 2],
    [8, 9, 1, 6, 0, 4, 3, 5, 2, 7],
    [9, 4, 5, 3, 1, 2, 6, 8, 7, 0],
    [4, 2, 8, 6, 5, 7, 3, 9, 0, 1],
    [2, 7, 9, 3, 8, 0, 6, 4, 1, 5],
    [7, 0, 4, 6, 9, 1, 3, 2, 5, 8],
];

/// Inverses in D5.
const INV: [u8; 10] = [0, 4, 3, 2, 1, 5, 6, 7, 8, 9];

fn digits_reversed(number: &str) -> Option<Vec<u8>> {
    number
        .chars()
        .rev()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect()
}

/// `true` when `number` (check digit last) is non-empty, all ASCII digits,
/// and checksums to zero.
pub fn validate(number: &str) -> bool {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let Some(digits) = digits_reversed(number) else {
        return false;
    };
    let check = digits
        .iter()
        .enumerate()
        .fold(0u8, |c, (i, &d)| D[c as usize][P[i % 8][d as usize] as usize]);
    check == 0
}

/// Check digit to append to `payload`, or `None` if it is not all digits.
pub fn generate(payload: &str) -> Option<u8> {
    if !payload.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = digits_reversed(payload)?;
    let check = digits
        .iter()
        .enumerate()
        .fold(0u8, |c, (i, &d)| D[c as usize][P[(i + 1) % 8][d as usize] as usize]);
    Some(INV[check as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_check_digit(payload: &str) -> String {
        let digit = generate(payload).unwrap();
        format!("{payload}{digit}")
    }

    #[test]
    fn known_vector() {
        // Textbook example: 236 -> check digit 3.
        assert_eq!(generate("236"), Some(3));
        assert!(validate("2363"));
        assert!(!validate("2364"));
    }

    /// Evenly spread 11-digit payloads, including all zeros.
    fn sampled_payloads() -> impl Iterator<Item = String> {
        (0..10u64.pow(11))
            .step_by(999_983)
            .chain(std::iter::once(99_999_999_999))
            .map(|n| format!("{n:011}"))
    }

    #[test]
    fn generated_numbers_validate() {
        for payload in sampled_payloads().chain(["0".to_string(), "12345".to_string()]) {
            let number = with_check_digit(&payload);
            assert!(validate(&number), "{number} should validate");
        }
    }

    #[test]
    fn every_single_digit_corruption_is_caught() {
        for payload in sampled_payloads() {
            let number = with_check_digit(&payload).into_bytes();
            for pos in 0..number.len() {
                for replacement in b'0'..=b'9' {
                    if replacement == number[pos] {
                        continue;
                    }
                    let mut corrupted = number.clone();
                    corrupted[pos] = replacement;
                    let corrupted = String::from_utf8(corrupted).unwrap();
                    assert!(!validate(&corrupted), "{corrupted} should fail");
                }
            }
        }
    }

    #[test]
    fn adjacent_transpositions_are_caught() {
        for payload in sampled_payloads() {
            let mut bytes = with_check_digit(&payload).into_bytes();
            for pos in 0..bytes.len() - 1 {
                if bytes[pos] == bytes[pos + 1] {
                    continue;
                }
                bytes.swap(pos, pos + 1);
                let swapped = String::from_utf8(bytes.clone()).unwrap();
                assert!(!validate(&swapped), "{swapped} should fail");
                bytes.swap(pos, pos + 1);
            }
        }
    }

    #[test]
    fn non_digits_are_rejected() {
        assert!(!validate(""));
        assert!(!validate("2363a"));
        assert!(!validate("２３６３"));
        assert_eq!(generate("12a"), None);
    }
}
