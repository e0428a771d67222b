use log::debug;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha2::Sha256;
use x509_cert::der::{Decode, DecodePem, Encode};
use x509_cert::Certificate;

use crate::error::{error_codes, PensignError, PensignResult};
use crate::pdf::{self, SignatureBlock};
use crate::utils;

/// Result of verifying a document
///
/// `NoSignaturePresent` is a valid outcome, not an error: there was nothing
/// to verify. `Invalid` covers both a signed range that no longer matches
/// the signature (tampering) and a signer certificate that is not the trust
/// anchor; the distinction is logged for diagnostics but collapsed for
/// callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The signature is cryptographically valid and chains to the anchor
    Valid,
    /// The signature does not check out (terminal, surfaced to the user)
    Invalid,
    /// The document carries no signature; nothing to verify
    NoSignaturePresent,
}

/// The single certificate trusted for verification
///
/// Constructed from the certificate exported by the key-custody side. No CA
/// bundle or chain exists; a document's signer must be exactly this
/// certificate.
#[derive(Debug, Clone)]
pub struct TrustAnchor {
    certificate_der: Vec<u8>,
    verifying_key: VerifyingKey<Sha256>,
}

impl TrustAnchor {
    /// DER bytes of the anchored certificate
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }
}

/// Parse certificate bytes in either PEM or DER form
fn parse_certificate(bytes: &[u8]) -> PensignResult<Certificate> {
    let parsed = if bytes.starts_with(b"-----BEGIN") {
        Certificate::from_pem(bytes)
    } else {
        Certificate::from_der(bytes)
    };
    parsed.map_err(|e| {
        PensignError::certificate_error(
            "parse",
            &e.to_string(),
            error_codes::CERTIFICATE_PARSE_FAILED,
        )
    })
}

/// Extract the RSA verifying key from a certificate
fn verifying_key_of(certificate: &Certificate) -> PensignResult<VerifyingKey<Sha256>> {
    let spki_der = certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| {
            PensignError::certificate_error(
                "parse",
                &e.to_string(),
                error_codes::CERTIFICATE_PARSE_FAILED,
            )
        })?;
    let public_key = RsaPublicKey::from_public_key_der(&spki_der).map_err(|e| {
        PensignError::certificate_error(
            "parse",
            &format!("certificate does not carry an RSA key: {}", e),
            error_codes::CERTIFICATE_PARSE_FAILED,
        )
    })?;
    Ok(VerifyingKey::<Sha256>::new(public_key))
}

/// Load the trust anchor from exported certificate bytes
///
/// Accepts PEM or DER. The certificate must be self-signed: issuer equals
/// subject, and its signature must verify under its own public key. A
/// certificate failing either check cannot act as an anchor.
///
/// # Errors
///
/// `Certificate` with a parse, not-self-signed, or self-signature error
/// code. These are configuration faults, distinct from any verification
/// outcome.
pub fn load_trust_anchor(certificate_bytes: &[u8]) -> PensignResult<TrustAnchor> {
    let certificate = parse_certificate(certificate_bytes)?;

    if certificate.tbs_certificate.issuer != certificate.tbs_certificate.subject {
        return Err(PensignError::certificate_error(
            "load_trust_anchor",
            "issuer does not equal subject",
            error_codes::CERTIFICATE_NOT_SELF_SIGNED,
        ));
    }

    let verifying_key = verifying_key_of(&certificate)?;

    let tbs_der = certificate.tbs_certificate.to_der().map_err(|e| {
        PensignError::certificate_error(
            "load_trust_anchor",
            &e.to_string(),
            error_codes::CERTIFICATE_PARSE_FAILED,
        )
    })?;
    let self_signature =
        Signature::try_from(certificate.signature.raw_bytes()).map_err(|e| {
            PensignError::certificate_error(
                "load_trust_anchor",
                &e.to_string(),
                error_codes::CERTIFICATE_PARSE_FAILED,
            )
        })?;
    verifying_key
        .verify(&tbs_der, &self_signature)
        .map_err(|_| {
            PensignError::certificate_error(
                "load_trust_anchor",
                "self-signature does not verify",
                error_codes::CERTIFICATE_SELF_SIGNATURE_INVALID,
            )
        })?;

    let certificate_der = certificate.to_der().map_err(|e| {
        PensignError::certificate_error(
            "load_trust_anchor",
            &e.to_string(),
            error_codes::CERTIFICATE_PARSE_FAILED,
        )
    })?;

    Ok(TrustAnchor {
        certificate_der,
        verifying_key,
    })
}

/// A located, decoded embedded signature
///
/// `signed_len` is the length of the byte range the signature covers:
/// everything preceding the signature block.
#[derive(Debug, Clone)]
pub struct SignatureHandle {
    pub signed_len: usize,
    pub block: SignatureBlock,
}

/// Scan a document for an embedded signature
///
/// Returns `Ok(None)` when there is no signature at all - a distinct
/// outcome from an invalid one. A signature marker whose block is damaged
/// or truncated is an error here; [`verify`] folds that into `Invalid`.
pub fn extract_signature(document: &[u8]) -> PensignResult<Option<SignatureHandle>> {
    Ok(pdf::parse_signature_block(document)?.map(|(offset, block)| SignatureHandle {
        signed_len: offset,
        block,
    }))
}

/// Verify a document against the trust anchor
///
/// Validates, in order: presence and integrity of the signature block, the
/// recorded digest algorithm, identity between the embedded signer
/// certificate and the anchor, and the RSA signature over the signed byte
/// range. All failure modes after "no signature at all" collapse to
/// `Invalid`; the specific reason is logged at debug level.
pub fn verify(document: &[u8], anchor: &TrustAnchor) -> PensignResult<VerificationOutcome> {
    if !pdf::is_pdf(document) {
        return Err(PensignError::invalid_document(
            "not a PDF file",
            error_codes::NOT_A_PDF,
        ));
    }

    let handle = match extract_signature(document) {
        Ok(Some(handle)) => handle,
        Ok(None) => return Ok(VerificationOutcome::NoSignaturePresent),
        Err(e) => {
            debug!("signature block rejected: {}", e);
            return Ok(VerificationOutcome::Invalid);
        }
    };

    if handle.block.digest_algorithm != pdf::DIGEST_ALGORITHM {
        debug!(
            "unsupported digest algorithm in signature block: {}",
            handle.block.digest_algorithm
        );
        return Ok(VerificationOutcome::Invalid);
    }

    if !utils::constant_time_eq(&handle.block.certificate_der, &anchor.certificate_der) {
        debug!("signer certificate does not match the trust anchor");
        return Ok(VerificationOutcome::Invalid);
    }

    let signature = match Signature::try_from(&handle.block.signature[..]) {
        Ok(signature) => signature,
        Err(e) => {
            debug!("signature bytes are malformed: {}", e);
            return Ok(VerificationOutcome::Invalid);
        }
    };

    match anchor
        .verifying_key
        .verify(&document[..handle.signed_len], &signature)
    {
        Ok(()) => Ok(VerificationOutcome::Valid),
        Err(_) => {
            debug!("signed content does not match the signature (tampering)");
            Ok(VerificationOutcome::Invalid)
        }
    }
}
