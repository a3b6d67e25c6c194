use std::fmt::{self, Debug, Display, Formatter};

use sha2::{Digest, Sha256};

/// A login forwarded to the infoscreen as basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// The demo login that never reaches the infoscreen.
    pub fn is_example(&self) -> bool {
        self.username == "example" && self.password == "example"
    }

    pub fn identity(&self) -> Identity {
        let mut hasher = Sha256::new();
        hasher.update(self.username.as_bytes());
        hasher.update(b":");
        hasher.update(self.password.as_bytes());
        Identity(hex::encode(hasher.finalize()))
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Cache key bound to one exact username/password pair, so a cached store is
/// never handed to a different password for the same user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // a prefix is enough to tell tenants apart in logs
        write!(f, "{}", &self.0[..12])
    }
}
