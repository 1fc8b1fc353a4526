//! Provider-independent webhook model: payload decoding, canonicalization and
//! authenticity checks. Nothing in this crate performs I/O.

pub mod event;
pub mod normalizer;
pub mod payload;
pub mod verify;

pub use event::{branch_from_ref, CanonicalEvent, Trigger, DEMO_COMMIT, MESSAGE_VERSION};
pub use normalizer::{Normalizer, NormalizerError};
pub use payload::{decode, extract_payload, PayloadError, PayloadShape};
pub use verify::{HmacAlgorithm, SecretPolicy, VerifyError};
