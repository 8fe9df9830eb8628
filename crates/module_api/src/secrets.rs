//! The trust token handed to loaders during discovery.

use uuid::Uuid;

/// Opaque credential issued by a host to the loaders it runs.
///
/// Modules remember which token built them and only accept lifecycle change
/// requests carrying the same token, so nothing but their host can move them
/// forward. Tokens cannot be cloned and each one is unique.
pub struct LoadingSecrets {
    nonce: Uuid,
}

impl LoadingSecrets {
    /// Issues a fresh token.
    pub fn issue() -> Self {
        Self {
            nonce: Uuid::new_v4(),
        }
    }

    pub(crate) fn fingerprint(&self) -> Uuid {
        self.nonce
    }
}

impl std::fmt::Debug for LoadingSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LoadingSecrets(..)")
    }
}
