//! Artifact to snapshot decoding
//!
//! [`RestoreDecoder`] is the only way from artifact bytes to a [`Snapshot`].
//! Preview, full restore and selective restore all go through it, so none
//! of them can skip tag verification or payload validation.

use std::sync::Arc;

use crate::envelope::EnvelopeCipher;
use crate::error::BackupResult;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone)]
pub struct RestoreDecoder {
    cipher: Arc<EnvelopeCipher>,
}

impl RestoreDecoder {
    pub fn new(cipher: Arc<EnvelopeCipher>) -> Self {
        Self { cipher }
    }

    /// Authenticate, decrypt and validate an artifact.
    pub fn decode(&self, artifact: &[u8]) -> BackupResult<Snapshot> {
        let plaintext = self.cipher.decrypt(artifact)?;
        let snapshot = Snapshot::from_json_bytes(&plaintext)?;

        tracing::debug!(
            tables = snapshot.data.len(),
            exported_at = %snapshot.exported_at,
            "Decoded backup artifact"
        );
        Ok(snapshot)
    }
}
