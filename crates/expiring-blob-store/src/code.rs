//! Short codes and storage keys

use rand::Rng;
use serde::Serialize;
use std::fmt;

const MIN_CODE: u32 = 100_000;
const MAX_CODE: u32 = 999_999;

/// The 6-digit numeral embedded in a storage key.
///
/// Codes are drawn uniformly from `100000..=999999`, so they always render
/// as exactly six digits. They are not unique: two uploads can draw the
/// same code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ShortCode(u32);

impl ShortCode {
    /// Draw a fresh random code
    pub fn generate() -> Self {
        Self(rand::thread_rng().gen_range(MIN_CODE..=MAX_CODE))
    }

    /// Build a code from a number, rejecting anything outside the 6-digit range
    pub fn new(value: u32) -> Option<Self> {
        (MIN_CODE..=MAX_CODE).contains(&value).then_some(Self(value))
    }

    /// Parse user input such as a URL segment
    pub fn parse(input: &str) -> Option<Self> {
        if input.len() != 6 || !input.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        input.parse().ok().and_then(Self::new)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ShortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Build the storage key `<name>-<code><ext>`
///
/// `ext` carries its leading dot (`.js`).
pub fn compose_key(name: &str, code: ShortCode, ext: &str) -> String {
    format!("{}-{}{}", name, code, ext)
}
