use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use log::{debug, info};
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::Sha256;
use x509_cert::Certificate;

use crate::custody;
use crate::error::{error_codes, PensignError, PensignResult};
use crate::pdf::{self, SignatureBlock};

/// Signature lifecycle state of a document
///
/// Transitions run forward only; `Signed` is terminal. The state is always
/// derived from the document bytes themselves - there is no stage counter
/// held across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// No reserved field and no signature
    Unsigned,
    /// A signature field has been reserved but not yet filled
    FieldReserved,
    /// The document carries an embedded signature (terminal)
    Signed,
}

/// Outcome of preparing a document for signing
///
/// The three outcomes are deliberately distinct because the caller's
/// recovery path differs for each: proceed, give up on this document, or
/// remediate the file lock and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// The signature field is reserved; signing may proceed
    Prepared,
    /// The document already carries a signature (terminal refusal)
    AlreadySigned,
    /// The document cannot be opened for writing
    PermissionDenied,
}

/// Read a document, mapping an OS permission refusal to its own error kind
fn read_document(path: &Path) -> PensignResult<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => PensignError::PermissionDenied {
            path: path.display().to_string(),
        },
        _ => e.into(),
    })
}

/// Derive the signing state from document bytes
fn state_of(bytes: &[u8]) -> DocumentState {
    if pdf::find_signature_offset(bytes).is_some() {
        DocumentState::Signed
    } else if pdf::find_field_offset(bytes).is_some() {
        DocumentState::FieldReserved
    } else {
        DocumentState::Unsigned
    }
}

/// Inspect a document and report its signing state
///
/// # Errors
///
/// `InvalidDocument` if the file is not a PDF; IO errors propagate.
pub fn load(path: &Path) -> PensignResult<DocumentState> {
    let bytes = read_document(path)?;
    if !pdf::is_pdf(&bytes) {
        return Err(PensignError::invalid_document(
            "not a PDF file",
            error_codes::NOT_A_PDF,
        ));
    }
    Ok(state_of(&bytes))
}

/// Reserve the signature field on a document
///
/// Appends the field marker at the end of the file - the fixed position for
/// all Pensign signatures - as an incremental write: every byte of the
/// original content remains untouched. The write is synced to disk before
/// returning so that a subsequent [`sign`] reads durable state.
///
/// An already-signed document is refused without being opened for writing,
/// so it stays byte-for-byte unchanged. A document whose field is already
/// reserved (an abandoned earlier session) reports `Prepared` without a
/// second marker: reservations are idempotent and re-signable.
///
/// # Returns
///
/// One of the three [`PrepareOutcome`] values. OS-level write refusal is an
/// outcome, not an `Err`, because it is recoverable by the user.
pub fn reserve_signature_field(path: &Path) -> PensignResult<PrepareOutcome> {
    let bytes = read_document(path)?;
    if !pdf::is_pdf(&bytes) {
        return Err(PensignError::invalid_document(
            "not a PDF file",
            error_codes::NOT_A_PDF,
        ));
    }

    match state_of(&bytes) {
        DocumentState::Signed => return Ok(PrepareOutcome::AlreadySigned),
        DocumentState::FieldReserved => {
            debug!("field already reserved on {}, reusing it", path.display());
            return Ok(PrepareOutcome::Prepared);
        }
        DocumentState::Unsigned => {}
    }

    let mut file = match OpenOptions::new().append(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Ok(PrepareOutcome::PermissionDenied);
        }
        Err(e) => return Err(e.into()),
    };

    file.write_all(pdf::FIELD_MARKER)?;
    file.sync_all()?;

    info!("signature field reserved on {}", path.display());
    Ok(PrepareOutcome::Prepared)
}

/// Sign a document with a reserved field
///
/// Computes a SHA-256 digest over every byte of the document as it stands
/// (the content preceding the signature block), signs it with PKCS#1 v1.5,
/// and appends the signature block carrying the signature and the signer's
/// certificate. The input file is not modified; the signed bytes are
/// returned for [`finalize`].
///
/// The caller holds the decrypted private key only for the duration of this
/// call; nothing is retained here.
///
/// # Errors
///
/// * `AlreadySigned` if the document already carries a signature.
/// * `InvalidDocument` with code `FIELD_NOT_RESERVED` if
///   [`reserve_signature_field`] has not run - states are never skipped.
/// * `Signing` if the RSA operation fails.
pub fn sign(
    path: &Path,
    private_key: &RsaPrivateKey,
    certificate: &Certificate,
) -> PensignResult<Vec<u8>> {
    let bytes = read_document(path)?;
    if !pdf::is_pdf(&bytes) {
        return Err(PensignError::invalid_document(
            "not a PDF file",
            error_codes::NOT_A_PDF,
        ));
    }

    match state_of(&bytes) {
        DocumentState::Signed => {
            return Err(PensignError::AlreadySigned {
                path: path.display().to_string(),
            });
        }
        DocumentState::Unsigned => {
            return Err(PensignError::invalid_document(
                "signature field has not been reserved",
                error_codes::FIELD_NOT_RESERVED,
            ));
        }
        DocumentState::FieldReserved => {}
    }

    let signer = rsa::pkcs1v15::SigningKey::<Sha256>::new(private_key.clone());
    let signature = signer
        .try_sign(&bytes)
        .map_err(|e| PensignError::signing_error(&format!("RSA signing failed: {}", e)))?;

    let block = SignatureBlock {
        digest_algorithm: pdf::DIGEST_ALGORITHM.to_string(),
        signature: signature.to_vec(),
        certificate_der: custody::certificate_der(certificate)?,
    };

    let mut signed = bytes;
    let covered = signed.len();
    signed.extend_from_slice(&pdf::encode_signature_block(&block)?);

    info!(
        "signed {} ({} bytes covered by signature)",
        path.display(),
        covered
    );
    Ok(signed)
}

/// Persist the signed document and retire the unsigned source
///
/// Writes the signed bytes to `destination`, syncs them to disk, and only
/// then deletes the source file. If the write fails for any reason the
/// source is left untouched; deletion is gated strictly on a successful,
/// durable write. Destination and source must be different paths.
pub fn finalize(signed_bytes: &[u8], source: &Path, destination: &Path) -> PensignResult<()> {
    if source == destination {
        return Err(PensignError::invalid_parameter(
            "destination",
            "a path distinct from the source document",
            &destination.display().to_string(),
        ));
    }

    let mut file = fs::File::create(destination).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => PensignError::PermissionDenied {
            path: destination.display().to_string(),
        },
        _ => PensignError::from(e),
    })?;
    file.write_all(signed_bytes)?;
    file.sync_all()?;

    fs::remove_file(source)?;

    info!(
        "signed document written to {}, source {} removed",
        destination.display(),
        source.display()
    );
    Ok(())
}
