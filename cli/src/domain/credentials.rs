//! One-run SSH credential.

use std::fmt;

/// A key pair generated for a single run.
///
/// The private half never leaves the process except as the identity file of
/// the SSH session that uses it.
#[derive(Clone, PartialEq, Eq)]
pub struct EphemeralKeyPair {
    private_pem: String,
    public_openssh: String,
}

impl EphemeralKeyPair {
    #[must_use]
    pub fn new(private_pem: String, public_openssh: String) -> Self {
        Self {
            private_pem,
            public_openssh,
        }
    }

    /// Private key, PEM encoded.
    #[must_use]
    pub fn private_pem(&self) -> &str {
        &self.private_pem
    }

    /// Public key in `authorized_keys` format.
    #[must_use]
    pub fn public_openssh(&self) -> &str {
        &self.public_openssh
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("private_pem", &"<redacted>")
            .field("public_openssh", &self.public_openssh)
            .finish()
    }
}
