use crate::error::{Error, Result};
use crate::record::Record;

/// True iff `s` ends in one or more ASCII decimal digits.
pub fn looks_like_trailing_digits(s: &str) -> bool {
    s.as_bytes().last().is_some_and(u8::is_ascii_digit)
}

/// Extra key checks applied before insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Accept any key, including the empty string
    #[default]
    Any,
    /// Require keys to end in a numeric suffix (e.g. "CS100")
    TrailingDigits,
}

impl KeyPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            KeyPolicy::TrailingDigits
        } else {
            KeyPolicy::Any
        }
    }

    pub fn check(&self, record: &Record) -> Result<()> {
        match self {
            KeyPolicy::Any => Ok(()),
            KeyPolicy::TrailingDigits => {
                if looks_like_trailing_digits(&record.key) {
                    Ok(())
                } else {
                    Err(Error::Validation(format!(
                        "key {:?} does not end in digits",
                        record.key
                    )))
                }
            }
        }
    }
}
