//! Scan hash.

use serde_derive::{Deserialize, Serialize};
use std::{convert::Infallible, fmt, str::FromStr};

/// Content derived identifier of an uploaded package.
///
/// The hash is assigned by the analysis service on upload and is the correlation key of every
/// later call. It is opaque to the client: it is never validated, normalized or derived
/// locally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hash(String);

impl Hash {
    /// Wraps a hash returned by the service.
    pub fn new<S: Into<String>>(hash: S) -> Self {
        Hash(hash.into())
    }

    /// Gets the hash as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Hash {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<String> for Hash {
    fn from(hash: String) -> Self {
        Hash(hash)
    }
}

impl<'a> From<&'a str> for Hash {
    fn from(hash: &'a str) -> Self {
        Hash(hash.to_owned())
    }
}

impl FromStr for Hash {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Hash::from(s))
    }
}

impl PartialEq<str> for Hash {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl<'a> PartialEq<&'a str> for Hash {
    fn eq(&self, other: &&'a str) -> bool {
        self.0 == *other
    }
}
