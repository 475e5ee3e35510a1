//! Secret strings that never show up in logs
//!
//! The backup key-derivation secret and the administrative token both pass
//! through configuration structs that are routinely `Debug`-printed. Wrapping
//! them in [`SecretString`] keeps them out of that output and zeroes them
//! when they are dropped.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A string that redacts itself in `Debug`/`Display` and is zeroed on drop.
///
/// # Examples
///
/// ```
/// use strongbox_core::SecretString;
///
/// let token = SecretString::new("s3cr3t".to_string());
/// assert_eq!(format!("{:?}", token), "[REDACTED]");
/// assert_eq!(token.expose_as_str(), "s3cr3t");
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString {
    inner: String,
}

impl SecretString {
    pub fn new(value: String) -> Self {
        Self { inner: value }
    }

    /// Expose the secret value for use. The returned slice must never be logged.
    pub fn expose_as_str(&self) -> &str {
        &self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Compare against a candidate in constant time.
    pub fn constant_time_eq(&self, candidate: &str) -> bool {
        use subtle::ConstantTimeEq;
        self.inner.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::str::FromStr for SecretString {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.to_string()))
    }
}
