use std::collections::HashMap;

use once_cell::sync::Lazy;
use thiserror::Error;

/// Approximate 2024 snapshot: units of each currency per 1 USD. Never refreshed at runtime.
pub const CURRENCY_RATES: [(&str, f64); 20] = [
    ("USD", 1.0),
    ("EUR", 0.93),
    ("GBP", 0.81),
    ("INR", 83.10),
    ("JPY", 155.46),
    ("CNY", 7.23),
    ("AED", 3.67),
    ("NGN", 1425.50),
    ("BRL", 5.15),
    ("CAD", 1.36),
    ("AUD", 1.52),
    ("ZAR", 18.79),
    ("MXN", 17.10),
    ("RUB", 93.25),
    ("PKR", 278.50),
    ("BDT", 117.50),
    ("EGP", 47.00),
    ("KES", 131.40),
    ("TRY", 32.00),
    ("THB", 36.80),
];

pub const RATES_AS_OF: &str = "2024";

static RATE_INDEX: Lazy<HashMap<&'static str, f64>> =
    Lazy::new(|| CURRENCY_RATES.iter().copied().collect());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("unknown currency code {0:?}")]
    Unknown(String),
}

pub fn codes() -> impl Iterator<Item = &'static str> {
    CURRENCY_RATES.iter().map(|(code, _)| *code)
}

pub fn rate(code: &str) -> Result<f64, CurrencyError> {
    RATE_INDEX
        .get(code.trim().to_ascii_uppercase().as_str())
        .copied()
        .ok_or_else(|| CurrencyError::Unknown(code.to_string()))
}

pub fn from_usd(amount_usd: f64, code: &str) -> Result<f64, CurrencyError> {
    Ok(amount_usd * rate(code)?)
}

pub fn to_usd(amount: f64, code: &str) -> Result<f64, CurrencyError> {
    Ok(amount / rate(code)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_twenty_positive_unique_rates() {
        assert_eq!(RATE_INDEX.len(), 20);
        assert!(CURRENCY_RATES.iter().all(|(_, r)| *r > 0.0));
        assert_eq!(codes().next(), Some("USD"));
    }

    #[test]
    fn usd_is_identity() {
        assert_eq!(from_usd(12_345_678.9, "USD").unwrap(), 12_345_678.9);
    }

    #[test]
    fn conversion_round_trips() {
        for code in codes() {
            let there = from_usd(2_500_000.0, code).unwrap();
            let back = to_usd(there, code).unwrap();
            assert!((back - 2_500_000.0).abs() < 1e-6, "{code}");
        }
    }

    #[test]
    fn codes_are_case_insensitive_and_unknowns_rejected() {
        assert_eq!(rate("eur").unwrap(), 0.93);
        assert_eq!(rate("XYZ"), Err(CurrencyError::Unknown("XYZ".to_string())));
    }
}
