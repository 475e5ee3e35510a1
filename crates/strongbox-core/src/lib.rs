//! # Strongbox Core
//!
//! Database-independent building blocks of the Strongbox backup engine:
//!
//! - **[Snapshot]**: the logical content of a backup (every table's rows plus
//!   an export timestamp), with strict payload validation
//! - **[EnvelopeCipher]**: AES-256-GCM sealing of snapshots into the
//!   `IV ‖ tag ‖ ciphertext` artifact format
//! - **[RestoreDecoder]**: the single path from artifact bytes back to a
//!   validated snapshot
//! - **[ConfirmationGate]**: the arithmetic challenge a client passes before
//!   it may issue a destructive restore
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use strongbox_core::{EnvelopeCipher, RestoreDecoder, SecretString, Snapshot};
//!
//! let cipher = Arc::new(EnvelopeCipher::from_secret(&SecretString::new("secret".into())));
//! let snapshot = Snapshot::new(chrono::Utc::now());
//!
//! let artifact = cipher.encrypt(&snapshot.to_json_bytes().unwrap()).unwrap();
//! let decoded = RestoreDecoder::new(cipher).decode(&artifact).unwrap();
//! assert_eq!(decoded, snapshot);
//! ```

pub mod decoder;
pub mod envelope;
pub mod error;
pub mod gate;
pub mod secret;
pub mod snapshot;

pub use decoder::RestoreDecoder;
pub use envelope::{EncryptionKey, EnvelopeCipher, HEADER_LEN, IV_LEN, TAG_LEN};
pub use error::{BackupError, BackupResult, RecoveredFailure};
pub use gate::{
    AnswerOutcome, Challenge, ConfirmationGate, GateError, GateState, MAX_ATTEMPTS,
    RestorePermit,
};
pub use secret::SecretString;
pub use snapshot::{ERROR_MARKER_KEY, Row, Snapshot, TableData};
