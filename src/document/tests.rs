use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;
use x509_cert::Certificate;

use super::*;
use crate::custody::tests::test_keypair;
use crate::custody::{issue_self_signed_certificate, DEFAULT_VALIDITY};
use crate::error::PensignError;
use crate::pdf;

fn write_sample_pdf(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(
        &path,
        b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<<>>\n%%EOF",
    )
    .unwrap();
    path
}

fn test_certificate() -> Certificate {
    issue_self_signed_certificate(test_keypair(), "Document Tests", DEFAULT_VALIDITY).unwrap()
}

#[test]
fn test_load_reports_unsigned() {
    let dir = tempdir().unwrap();
    let path = write_sample_pdf(dir.path(), "a.pdf");

    assert_eq!(load(&path).unwrap(), DocumentState::Unsigned);
}

#[test]
fn test_load_rejects_non_pdf() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, b"not a pdf").unwrap();

    assert!(matches!(
        load(&path),
        Err(PensignError::InvalidDocument { .. })
    ));
}

#[test]
fn test_reserve_appends_only() {
    let dir = tempdir().unwrap();
    let path = write_sample_pdf(dir.path(), "a.pdf");
    let original = fs::read(&path).unwrap();

    assert_eq!(
        reserve_signature_field(&path).unwrap(),
        PrepareOutcome::Prepared
    );

    // Incremental write: the original bytes are a strict prefix
    let reserved = fs::read(&path).unwrap();
    assert_eq!(&reserved[..original.len()], &original[..]);
    assert_eq!(&reserved[original.len()..], pdf::FIELD_MARKER);
    assert_eq!(load(&path).unwrap(), DocumentState::FieldReserved);
}

#[test]
fn test_reserve_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = write_sample_pdf(dir.path(), "a.pdf");

    reserve_signature_field(&path).unwrap();
    let after_first = fs::read(&path).unwrap();

    // Abandoned-session policy: an existing reservation is reused
    assert_eq!(
        reserve_signature_field(&path).unwrap(),
        PrepareOutcome::Prepared
    );
    assert_eq!(fs::read(&path).unwrap(), after_first);
}

#[test]
fn test_reserve_refuses_signed_document_unchanged() {
    let dir = tempdir().unwrap();
    let path = write_sample_pdf(dir.path(), "a.pdf");
    let certificate = test_certificate();

    reserve_signature_field(&path).unwrap();
    let signed = sign(&path, test_keypair().private_key(), &certificate).unwrap();
    fs::write(&path, &signed).unwrap();

    let before = fs::read(&path).unwrap();
    assert_eq!(
        reserve_signature_field(&path).unwrap(),
        PrepareOutcome::AlreadySigned
    );

    // Terminal refusal must leave the document byte-for-byte unchanged
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[cfg(unix)]
#[test]
fn test_reserve_reports_permission_denied() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let path = write_sample_pdf(dir.path(), "a.pdf");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o444)).unwrap();

    // Under CAP_DAC_OVERRIDE (root) the OS never refuses the write, so
    // there is nothing to observe
    if fs::OpenOptions::new().append(true).open(&path).is_ok() {
        return;
    }

    assert_eq!(
        reserve_signature_field(&path).unwrap(),
        PrepareOutcome::PermissionDenied
    );
}

#[test]
fn test_sign_requires_reservation() {
    let dir = tempdir().unwrap();
    let path = write_sample_pdf(dir.path(), "a.pdf");
    let certificate = test_certificate();

    // States are never skipped: Unsigned -> sign is refused
    let result = sign(&path, test_keypair().private_key(), &certificate);
    assert!(matches!(result, Err(PensignError::InvalidDocument { .. })));
}

#[test]
fn test_sign_refuses_signed_document() {
    let dir = tempdir().unwrap();
    let path = write_sample_pdf(dir.path(), "a.pdf");
    let certificate = test_certificate();

    reserve_signature_field(&path).unwrap();
    let signed = sign(&path, test_keypair().private_key(), &certificate).unwrap();
    fs::write(&path, &signed).unwrap();

    let result = sign(&path, test_keypair().private_key(), &certificate);
    assert!(matches!(result, Err(PensignError::AlreadySigned { .. })));
}

#[test]
fn test_sign_embeds_block_after_reserved_content() {
    let dir = tempdir().unwrap();
    let path = write_sample_pdf(dir.path(), "a.pdf");
    let certificate = test_certificate();

    reserve_signature_field(&path).unwrap();
    let reserved = fs::read(&path).unwrap();
    let signed = sign(&path, test_keypair().private_key(), &certificate).unwrap();

    // The reserved bytes are exactly the signed range
    assert_eq!(&signed[..reserved.len()], &reserved[..]);
    let (offset, block) = pdf::parse_signature_block(&signed).unwrap().unwrap();
    assert_eq!(offset, reserved.len());
    assert_eq!(block.digest_algorithm, pdf::DIGEST_ALGORITHM);
    assert!(signed.ends_with(b"%%EOF\n"));
}

#[test]
fn test_finalize_moves_and_removes_source() {
    let dir = tempdir().unwrap();
    let source = write_sample_pdf(dir.path(), "a.pdf");
    let destination = dir.path().join("signed_a.pdf");
    let certificate = test_certificate();

    reserve_signature_field(&source).unwrap();
    let signed = sign(&source, test_keypair().private_key(), &certificate).unwrap();
    finalize(&signed, &source, &destination).unwrap();

    assert!(!source.exists());
    assert_eq!(fs::read(&destination).unwrap(), signed);
}

#[test]
fn test_finalize_failure_keeps_source() {
    let dir = tempdir().unwrap();
    let source = write_sample_pdf(dir.path(), "a.pdf");
    let destination = dir.path().join("missing").join("signed_a.pdf");

    let result = finalize(b"signed bytes", &source, &destination);

    // Deletion is gated on a successful write
    assert!(result.is_err());
    assert!(source.exists());
}

#[test]
fn test_finalize_rejects_source_as_destination() {
    let dir = tempdir().unwrap();
    let source = write_sample_pdf(dir.path(), "a.pdf");

    let result = finalize(b"signed bytes", &source, &source);
    assert!(matches!(
        result,
        Err(PensignError::InvalidParameter { .. })
    ));
    assert!(source.exists());
}
