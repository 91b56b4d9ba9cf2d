//! Brazilian taxpayer document validation (CPF and CNPJ).
//!
//! Both documents end in two mod-11 weighted check digits. The caller picks
//! the algorithm by field name; these functions never guess from length.

/// Validates a CPF (11 digits, individual taxpayer ID).
///
/// Rejects non-digit input, wrong lengths, the all-same-digit sequences
/// (`000…0` through `999…9`, which satisfy the checksum but are not issued)
/// and bad check digits.
#[must_use]
pub fn valid_cpf(document: &str) -> bool {
    let Some(digits) = digits_of(document, 11) else {
        return false;
    };
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }
    check_digit_cpf(&digits[..9]) == digits[9] && check_digit_cpf(&digits[..10]) == digits[10]
}

/// Validates a CNPJ (14 digits, corporate taxpayer ID).
#[must_use]
pub fn valid_cnpj(document: &str) -> bool {
    let Some(digits) = digits_of(document, 14) else {
        return false;
    };
    check_digit_cnpj(&digits[..12]) == digits[12] && check_digit_cnpj(&digits[..13]) == digits[13]
}

fn digits_of(document: &str, expected_len: usize) -> Option<Vec<u32>> {
    if document.len() != expected_len {
        return None;
    }
    document.chars().map(|c| c.to_digit(10)).collect()
}

/// CPF check digit over the first `n` digits, weights `n+1` down to 2.
fn check_digit_cpf(digits: &[u32]) -> u32 {
    let weight_start = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (weight_start - i as u32))
        .sum();
    (sum * 10) % 11 % 10
}

/// CNPJ check digit; weights cycle 2..=9 from the rightmost digit.
fn check_digit_cnpj(digits: &[u32]) -> u32 {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| d * (2 + (i as u32) % 8))
        .sum();
    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        11 - remainder
    }
}
