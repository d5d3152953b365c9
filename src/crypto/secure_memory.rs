//! Secure memory handling for sensitive data
//!
//! Provides a passphrase wrapper that zeroes its contents on drop and never
//! prints them.

use std::fmt;
use std::ops::Deref;

use zeroize::Zeroizing;

/// A string type that zeros its contents on drop
///
/// Use this for passphrases and other sensitive string data.
pub struct SecureString {
    inner: Zeroizing<String>,
}

impl SecureString {
    /// Create a new SecureString
    pub fn new(s: impl Into<String>) -> Self {
        Self {
            inner: Zeroizing::new(s.into()),
        }
    }

    /// Get the string contents
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl Deref for SecureString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// Don't print the contents in Debug output
impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureString")
            .field("len", &self.inner.len())
            .finish()
    }
}

// Don't print the contents in Display output
impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED {} bytes]", self.inner.len())
    }
}
