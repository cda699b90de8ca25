//! # Identity Generator
//!
//! Produces unique, human-readable SKUs and scannable barcodes for new
//! products.
//!
//! ## Formats
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SKU:      PRD-482913-K7Q                                               │
//! │            │   │      └── 3 random base-36 chars (A-Z, 0-9)             │
//! │            │   └───────── last 6 digits of the clock (millis)           │
//! │            └───────────── fixed prefix                                  │
//! │                                                                         │
//! │  Barcode:  2 482913 07512 6                                             │
//! │            │ │      │     └── GS1 check digit                           │
//! │            │ │      └──────── 5 random digits                           │
//! │            │ └─────────────── last 6 digits of the clock                │
//! │            └───────────────── "2": in-store numbering range (EAN-13)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Collisions
//! A candidate that is already taken is retried with fresh randomness up to
//! [`MAX_RANDOM_ATTEMPTS`] times. After that a deterministic fallback walks
//! forward (`-1`, `-2`, ... for SKUs; body + 1 for barcodes) until a free
//! value is found, so generation always terminates.
//!
//! The caller supplies the clock and the set of values already assigned,
//! which keeps this module free of I/O. Uniqueness across concurrent
//! creators is the caller's job (the catalog serializes creation).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::Rng;

/// Prefix of every generated SKU.
pub const SKU_PREFIX: &str = "PRD";

/// Random retries before falling back to sequential suffixes.
pub const MAX_RANDOM_ATTEMPTS: usize = 16;

/// Leading digit of generated barcodes (GS1 restricted in-store range).
const BARCODE_PREFIX: char = '2';

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Number of values the 11-digit barcode body can take.
const BARCODE_BODY_SPACE: u64 = 100_000_000_000;

// =============================================================================
// Generator
// =============================================================================

/// SKU and barcode generator over any random source.
///
/// ## Example
/// ```rust
/// use std::collections::HashSet;
/// use chrono::Utc;
/// use motopos_core::identity::IdentityGenerator;
///
/// let mut generator = IdentityGenerator::new(rand::rng());
/// let sku = generator.generate_sku(Utc::now(), &HashSet::new());
/// assert!(sku.starts_with("PRD-"));
///
/// let barcode = generator.generate_barcode(Utc::now(), &HashSet::new());
/// assert_eq!(barcode.len(), 13);
/// ```
#[derive(Debug)]
pub struct IdentityGenerator<R: Rng> {
    rng: R,
}

impl<R: Rng> IdentityGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Generates a SKU not present in `taken`.
    pub fn generate_sku(&mut self, now: DateTime<Utc>, taken: &HashSet<String>) -> String {
        let clock = clock_suffix(now);
        let mut candidate = String::new();

        for _ in 0..MAX_RANDOM_ATTEMPTS {
            candidate = format!("{}-{}-{}", SKU_PREFIX, clock, self.random_base36(3));
            if !taken.contains(&candidate) {
                return candidate;
            }
        }

        let mut sequence: u64 = 1;
        loop {
            let fallback = format!("{candidate}-{sequence}");
            if !taken.contains(&fallback) {
                return fallback;
            }
            sequence += 1;
        }
    }

    /// Generates an EAN-13 barcode not present in `taken`.
    pub fn generate_barcode(&mut self, now: DateTime<Utc>, taken: &HashSet<String>) -> String {
        let clock = clock_suffix(now);
        let mut body = String::new();

        for _ in 0..MAX_RANDOM_ATTEMPTS {
            body = format!("{}{:05}", clock, self.rng.random_range(0..100_000u32));
            let candidate = ean13_from_body(&body);
            if !taken.contains(&candidate) {
                return candidate;
            }
        }

        // The body is 11 ASCII digits by construction.
        let mut numeric: u64 = body.parse().unwrap_or(0);
        for _ in 0..BARCODE_BODY_SPACE {
            numeric = (numeric + 1) % BARCODE_BODY_SPACE;
            let candidate = ean13_from_body(&format!("{numeric:011}"));
            if !taken.contains(&candidate) {
                return candidate;
            }
        }

        // Every in-store barcode is taken; leave the range rather than loop.
        let mut sequence: u64 = 1;
        loop {
            let candidate = format!("{}{}", ean13_from_body(&body), sequence);
            if !taken.contains(&candidate) {
                return candidate;
            }
            sequence += 1;
        }
    }

    fn random_base36(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| BASE36[self.rng.random_range(0..BASE36.len())] as char)
            .collect()
    }
}

// =============================================================================
// EAN-13 Helpers
// =============================================================================

/// Last six digits of the millisecond clock.
fn clock_suffix(now: DateTime<Utc>) -> String {
    format!("{:06}", now.timestamp_millis().rem_euclid(1_000_000))
}

/// Builds a full EAN-13 from an 11-digit body.
fn ean13_from_body(body: &str) -> String {
    let first12 = format!("{BARCODE_PREFIX}{body}");
    let check = ean13_check_digit(&first12).unwrap_or(0);
    format!("{first12}{check}")
}

/// Computes the GS1 check digit for the first 12 digits of an EAN-13.
///
/// Returns `None` unless `digits` is exactly 12 ASCII digits.
///
/// ```rust
/// use motopos_core::identity::ean13_check_digit;
///
/// // 400638133393 → 1 (a well-known retail EAN)
/// assert_eq!(ean13_check_digit("400638133393"), Some(1));
/// ```
pub fn ean13_check_digit(digits: &str) -> Option<u32> {
    if digits.len() != 12 {
        return None;
    }

    let mut sum = 0;
    for (index, c) in digits.chars().enumerate() {
        let digit = c.to_digit(10)?;
        sum += if index % 2 == 0 { digit } else { digit * 3 };
    }

    Some((10 - sum % 10) % 10)
}

/// Whether `code` is a 13-digit EAN with a correct check digit.
pub fn is_valid_ean13(code: &str) -> bool {
    if code.len() != 13 || !code.is_ascii() {
        return false;
    }
    let (first12, check) = code.split_at(12);
    match (ean13_check_digit(first12), check.chars().next().and_then(|c| c.to_digit(10))) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => false,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
