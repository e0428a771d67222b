/*!
 * Error handling for the Pensign key-custody and document-signature crate
 *
 * Provides a single error taxonomy covering key generation, PIN-based key
 * recovery, certificate issuance, document preparation and signing. Each
 * variant carries an error code and maps to one user-facing message and one
 * recovery action, so the calling layer never has to guess whether a failure
 * is retryable.
 */

use thiserror::Error;

/// Error type for all key-custody and signing operations
///
/// Recovery semantics, per variant:
///
/// * `KeyGeneration`, `Certificate`, `Signing` - fatal to the current
///   operation; entropy or algorithm failures are not transient.
/// * `IncorrectPin` - expected and recoverable; the user may retry with a
///   different PIN. The crate performs no automatic retries.
/// * `AlreadySigned` - terminal for the document in question.
/// * `PermissionDenied` - recoverable after external remediation (unlock the
///   file, remount the volume read-write).
/// * `ArtifactUnavailable` - recoverable once the removable medium holding
///   the private-key artifact is attached again.
#[derive(Debug, Error)]
pub enum PensignError {
    #[error("Key generation failed: {cause}")]
    KeyGeneration { cause: String, error_code: u32 },

    #[error("Incorrect PIN")]
    IncorrectPin,

    #[error("Private-key sealing failed: {cause}")]
    Sealing { cause: String, error_code: u32 },

    #[error("Certificate operation failed: {operation} - {cause}")]
    Certificate {
        operation: String,
        cause: String,
        error_code: u32,
    },

    #[error("Document already carries a signature: {path}")]
    AlreadySigned { path: String },

    #[error("No write permission for {path}")]
    PermissionDenied { path: String },

    #[error("Private-key artifact not available at {path}")]
    ArtifactUnavailable { path: String },

    #[error("Invalid document: {cause}")]
    InvalidDocument { cause: String, error_code: u32 },

    #[error("Signature generation failed: {cause}")]
    Signing { cause: String, error_code: u32 },

    #[error("Invalid parameter: {parameter} - expected {expected}, got {actual}")]
    InvalidParameter {
        parameter: String,
        expected: String,
        actual: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Error code constants, grouped by subsystem
pub mod error_codes {
    // Key custody: 1000-1999
    pub const KEY_GENERATION_FAILED: u32 = 1001;
    pub const KEY_SIZE_TOO_SMALL: u32 = 1002;
    pub const KEY_SERIALIZATION_FAILED: u32 = 1003;

    // PIN-sealed artifact: 2000-2999
    pub const SEAL_FAILED: u32 = 2001;
    pub const INCORRECT_PIN: u32 = 2002;
    pub const ARTIFACT_MALFORMED: u32 = 2003;

    // Certificates: 3000-3999
    pub const CERTIFICATE_ISSUANCE_FAILED: u32 = 3001;
    pub const CERTIFICATE_PARSE_FAILED: u32 = 3002;
    pub const CERTIFICATE_NOT_SELF_SIGNED: u32 = 3003;
    pub const CERTIFICATE_SELF_SIGNATURE_INVALID: u32 = 3004;

    // Documents: 4000-4999
    pub const NOT_A_PDF: u32 = 4001;
    pub const FIELD_NOT_RESERVED: u32 = 4002;
    pub const SIGNATURE_BLOCK_MALFORMED: u32 = 4003;
    pub const DOCUMENT_ALREADY_SIGNED: u32 = 4004;
    pub const DOCUMENT_PERMISSION_DENIED: u32 = 4005;

    // Signing: 5000-5999
    pub const SIGNATURE_GENERATION_FAILED: u32 = 5001;

    // Removable media: 6000-6999
    pub const ARTIFACT_ABSENT: u32 = 6001;

    // Generic: 9000-9999
    pub const SERIALIZATION_FAILED: u32 = 9001;
    pub const IO_FAILED: u32 = 9002;
    pub const INVALID_PARAMETER: u32 = 9999;
}

impl PensignError {
    /// Get the numeric error code for this error
    pub fn error_code(&self) -> u32 {
        match self {
            PensignError::KeyGeneration { error_code, .. } => *error_code,
            PensignError::IncorrectPin => error_codes::INCORRECT_PIN,
            PensignError::Sealing { error_code, .. } => *error_code,
            PensignError::Certificate { error_code, .. } => *error_code,
            PensignError::AlreadySigned { .. } => error_codes::DOCUMENT_ALREADY_SIGNED,
            PensignError::PermissionDenied { .. } => error_codes::DOCUMENT_PERMISSION_DENIED,
            PensignError::ArtifactUnavailable { .. } => error_codes::ARTIFACT_ABSENT,
            PensignError::InvalidDocument { error_code, .. } => *error_code,
            PensignError::Signing { error_code, .. } => *error_code,
            PensignError::InvalidParameter { .. } => error_codes::INVALID_PARAMETER,
            PensignError::Serialization(_) => error_codes::SERIALIZATION_FAILED,
            PensignError::Io(_) => error_codes::IO_FAILED,
        }
    }

    /// Get a user-friendly error message
    pub fn user_friendly_message(&self) -> String {
        match self {
            PensignError::KeyGeneration { .. } => {
                "Key generation failed. No keypair was produced.".to_string()
            }
            PensignError::IncorrectPin => {
                "The PIN is incorrect. The private key was not recovered.".to_string()
            }
            PensignError::Sealing { .. } => {
                "The private key could not be encrypted for storage.".to_string()
            }
            PensignError::Certificate { operation, .. } => {
                format!("Certificate operation '{}' failed.", operation)
            }
            PensignError::AlreadySigned { path } => {
                format!("'{}' is already signed and cannot be signed again.", path)
            }
            PensignError::PermissionDenied { path } => {
                format!("'{}' could not be opened for writing.", path)
            }
            PensignError::ArtifactUnavailable { path } => {
                format!(
                    "The private-key artifact at '{}' is not present. Is the removable medium attached?",
                    path
                )
            }
            PensignError::InvalidDocument { cause, .. } => {
                format!("The document cannot be processed: {}.", cause)
            }
            PensignError::Signing { .. } => {
                "The cryptographic signature could not be produced.".to_string()
            }
            PensignError::InvalidParameter {
                parameter, expected, ..
            } => {
                format!("Invalid parameter '{}'. Expected {}.", parameter, expected)
            }
            PensignError::Serialization(_) => {
                "Data serialization failed. The data format may be corrupted.".to_string()
            }
            PensignError::Io(_) => {
                "Input/output operation failed. Check file permissions and disk space.".to_string()
            }
        }
    }

    /// Get the suggested recovery action, if one exists
    ///
    /// Returns `None` for failures that are terminal by design (an
    /// already-signed document, an entropy fault during key generation).
    pub fn suggested_remediation(&self) -> Option<String> {
        match self {
            PensignError::IncorrectPin => {
                Some("Ask the user to re-enter the PIN and retry decryption.".to_string())
            }
            PensignError::PermissionDenied { .. } => Some(
                "Close other applications holding the file, clear the read-only flag, and retry."
                    .to_string(),
            ),
            PensignError::ArtifactUnavailable { .. } => {
                Some("Attach the removable medium holding the private key and retry.".to_string())
            }
            PensignError::Io(_) => {
                Some("Check file permissions and available disk space.".to_string())
            }
            _ => None,
        }
    }

    /// Get the error category as a string
    pub fn error_type(&self) -> &'static str {
        match self {
            PensignError::KeyGeneration { .. } => "KeyGeneration",
            PensignError::IncorrectPin => "IncorrectPin",
            PensignError::Sealing { .. } => "Sealing",
            PensignError::Certificate { .. } => "Certificate",
            PensignError::AlreadySigned { .. } => "AlreadySigned",
            PensignError::PermissionDenied { .. } => "PermissionDenied",
            PensignError::ArtifactUnavailable { .. } => "ArtifactUnavailable",
            PensignError::InvalidDocument { .. } => "InvalidDocument",
            PensignError::Signing { .. } => "Signing",
            PensignError::InvalidParameter { .. } => "InvalidParameter",
            PensignError::Serialization(_) => "Serialization",
            PensignError::Io(_) => "Io",
        }
    }
}

/// Convenience constructors for common error shapes
impl PensignError {
    pub fn key_generation(cause: &str, error_code: u32) -> Self {
        PensignError::KeyGeneration {
            cause: cause.to_string(),
            error_code,
        }
    }

    pub fn certificate_error(operation: &str, cause: &str, error_code: u32) -> Self {
        PensignError::Certificate {
            operation: operation.to_string(),
            cause: cause.to_string(),
            error_code,
        }
    }

    pub fn invalid_document(cause: &str, error_code: u32) -> Self {
        PensignError::InvalidDocument {
            cause: cause.to_string(),
            error_code,
        }
    }

    pub fn signing_error(cause: &str) -> Self {
        PensignError::Signing {
            cause: cause.to_string(),
            error_code: error_codes::SIGNATURE_GENERATION_FAILED,
        }
    }

    pub fn invalid_parameter(parameter: &str, expected: &str, actual: &str) -> Self {
        PensignError::InvalidParameter {
            parameter: parameter.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl From<std::io::Error> for PensignError {
    fn from(err: std::io::Error) -> Self {
        PensignError::Io(format!("IO operation failed: {}", err))
    }
}

/// Result type alias for key-custody and signing operations
pub type PensignResult<T> = Result<T, PensignError>;
