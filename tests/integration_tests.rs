// Integration tests for the pensign crate
// Tests full workflows: custody establishment, private-key unlock,
// document signing and verification against the trust anchor

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use rsa::traits::PublicKeyParts;
use tempfile::{tempdir, TempDir};

use pensign::custody::{self, PublicArtifact};
use pensign::document;
use pensign::error::PensignError;
use pensign::verify::{self, load_trust_anchor};
use pensign::{
    establish_custody_with, sign_document, unlock_private_key, verify_document, MediaEvent,
    MediaWatcher, PrepareOutcome, SigningKeypair, VerificationOutcome,
};

const PIN: u64 = 271_828;

// RSA-4096 generation is too slow to repeat per test; the suite shares one
// reduced-size keypair across all workflows.
fn test_keypair() -> &'static SigningKeypair {
    static KEYPAIR: OnceLock<SigningKeypair> = OnceLock::new();
    KEYPAIR.get_or_init(|| SigningKeypair::generate_bits(2048).expect("keypair generation"))
}

struct Deployment {
    fixed: TempDir,
    media: TempDir,
    artifact_path: PathBuf,
}

impl Deployment {
    fn fixed_dir(&self) -> &std::path::Path {
        self.fixed.path()
    }
}

// Establish custody once into a pair of temporary "drives"
fn setup_deployment() -> Deployment {
    let fixed = tempdir().expect("fixed storage dir");
    let media = tempdir().expect("removable media dir");

    let split = establish_custody_with(
        test_keypair().clone(),
        PIN,
        "Integration Suite",
        fixed.path(),
        media.path(),
    )
    .expect("custody split");

    Deployment {
        fixed,
        media,
        artifact_path: split.private_artifact_path,
    }
}

fn write_pdf(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    let mut bytes = b"%PDF-1.7\n".to_vec();
    bytes.extend_from_slice(content);
    fs::write(&path, &bytes).expect("write fixture");
    path
}

#[test]
fn test_custody_establishment_writes_both_artifacts() {
    let deployment = setup_deployment();

    let artifact = PublicArtifact::load_from(deployment.fixed_dir()).expect("public artifact");
    assert!(artifact.public_key_pem.contains("BEGIN PUBLIC KEY"));
    assert!(artifact.certificate_pem.contains("BEGIN CERTIFICATE"));

    assert!(deployment.artifact_path.is_file());
    let sealed = fs::read(&deployment.artifact_path).expect("private artifact");
    assert!(sealed.starts_with(custody::ARTIFACT_MAGIC));
    // The sealed artifact must not leak the key in any recognizable form
    assert!(!sealed.windows(9).any(|w| w == b"BEGIN RSA"));
}

#[test]
fn test_unlock_round_trip_and_wrong_pin() {
    let deployment = setup_deployment();

    let key = unlock_private_key(&deployment.artifact_path, PIN).expect("unlock");
    assert_eq!(key.size(), test_keypair().private_key().size());

    let wrong = unlock_private_key(&deployment.artifact_path, PIN + 1);
    assert!(matches!(wrong, Err(PensignError::IncorrectPin)));
}

#[test]
fn test_unlock_fails_while_media_detached() {
    let deployment = setup_deployment();

    let detached = deployment.media.path().join("missing.bin");
    let result = unlock_private_key(&detached, PIN);
    assert!(matches!(
        result,
        Err(PensignError::ArtifactUnavailable { .. })
    ));

    // Reattaching the media makes the same call succeed
    let mut watcher = MediaWatcher::new(&detached);
    assert_eq!(watcher.poll(), None);
    fs::copy(&deployment.artifact_path, &detached).expect("reattach");
    assert_eq!(watcher.poll(), Some(MediaEvent::Attached));
    assert!(unlock_private_key(&detached, PIN).is_ok());
}

#[test]
fn test_full_signing_workflow() {
    let deployment = setup_deployment();
    let docs = tempdir().expect("document dir");

    // 1. Unlock the private key from the removable artifact
    let private_key = unlock_private_key(&deployment.artifact_path, PIN).expect("unlock");

    // 2. Sign a document: source is consumed, destination carries the block
    let certificate = custody::issue_self_signed_certificate(
        test_keypair(),
        "Integration Suite",
        custody::DEFAULT_VALIDITY,
    )
    .expect("certificate");
    let source = write_pdf(&docs, "contract.pdf", b"the agreed terms\n");
    let destination = docs.path().join("contract-signed.pdf");

    let outcome =
        sign_document(&source, &destination, &private_key, &certificate).expect("signing");
    assert_eq!(outcome, PrepareOutcome::Prepared);
    assert!(!source.exists());
    assert!(destination.is_file());

    // 3. Verify against the anchor loaded from fixed storage
    let artifact = PublicArtifact::load_from(deployment.fixed_dir()).expect("public artifact");
    let anchor = load_trust_anchor(artifact.certificate_pem.as_bytes()).expect("anchor");
    assert_eq!(
        verify_document(&destination, &anchor).expect("verification"),
        VerificationOutcome::Valid
    );

    // 4. The signed document is terminal: re-signing is refused
    let again = sign_document(&destination, &docs.path().join("twice.pdf"), &private_key,
        &certificate)
    .expect("second attempt");
    assert_eq!(again, PrepareOutcome::AlreadySigned);
}

#[test]
fn test_tampered_document_fails_verification() {
    let deployment = setup_deployment();
    let docs = tempdir().expect("document dir");

    let private_key = unlock_private_key(&deployment.artifact_path, PIN).expect("unlock");
    let certificate = custody::issue_self_signed_certificate(
        test_keypair(),
        "Integration Suite",
        custody::DEFAULT_VALIDITY,
    )
    .expect("certificate");

    let source = write_pdf(&docs, "invoice.pdf", b"amount due: 100 EUR\n");
    let destination = docs.path().join("invoice-signed.pdf");
    sign_document(&source, &destination, &private_key, &certificate).expect("signing");

    let mut bytes = fs::read(&destination).expect("read back");
    let index = bytes
        .windows(3)
        .position(|w| w == b"100")
        .expect("content present");
    bytes[index] = b'9';
    fs::write(&destination, &bytes).expect("tamper");

    let artifact = PublicArtifact::load_from(deployment.fixed_dir()).expect("public artifact");
    let anchor = load_trust_anchor(artifact.certificate_pem.as_bytes()).expect("anchor");
    assert_eq!(
        verify_document(&destination, &anchor).expect("verification"),
        VerificationOutcome::Invalid
    );
}

#[test]
fn test_unsigned_document_reports_no_signature() {
    let deployment = setup_deployment();
    let docs = tempdir().expect("document dir");
    let path = write_pdf(&docs, "plain.pdf", b"nothing signed here\n");

    let artifact = PublicArtifact::load_from(deployment.fixed_dir()).expect("public artifact");
    let anchor = load_trust_anchor(artifact.certificate_pem.as_bytes()).expect("anchor");
    assert_eq!(
        verify_document(&path, &anchor).expect("verification"),
        VerificationOutcome::NoSignaturePresent
    );
}

#[test]
fn test_abandoned_reservation_is_resumable() {
    let deployment = setup_deployment();
    let docs = tempdir().expect("document dir");

    let source = write_pdf(&docs, "draft.pdf", b"draft body\n");

    // A previous session reserved the field and then went away
    assert_eq!(
        document::reserve_signature_field(&source).expect("reserve"),
        PrepareOutcome::Prepared
    );

    let private_key = unlock_private_key(&deployment.artifact_path, PIN).expect("unlock");
    let certificate = custody::issue_self_signed_certificate(
        test_keypair(),
        "Integration Suite",
        custody::DEFAULT_VALIDITY,
    )
    .expect("certificate");

    let destination = docs.path().join("draft-signed.pdf");
    let outcome =
        sign_document(&source, &destination, &private_key, &certificate).expect("signing");
    assert_eq!(outcome, PrepareOutcome::Prepared);

    let artifact = PublicArtifact::load_from(deployment.fixed_dir()).expect("public artifact");
    let anchor = load_trust_anchor(artifact.certificate_pem.as_bytes()).expect("anchor");
    assert_eq!(
        verify_document(&destination, &anchor).expect("verification"),
        VerificationOutcome::Valid
    );
}

#[test]
fn test_anchor_from_foreign_deployment_rejects_signature() {
    let deployment = setup_deployment();
    let docs = tempdir().expect("document dir");

    let private_key = unlock_private_key(&deployment.artifact_path, PIN).expect("unlock");
    let certificate = custody::issue_self_signed_certificate(
        test_keypair(),
        "Integration Suite",
        custody::DEFAULT_VALIDITY,
    )
    .expect("certificate");

    let source = write_pdf(&docs, "memo.pdf", b"memo body\n");
    let destination = docs.path().join("memo-signed.pdf");
    sign_document(&source, &destination, &private_key, &certificate).expect("signing");

    let foreign = SigningKeypair::generate_bits(2048).expect("foreign keypair");
    let foreign_cert = custody::issue_self_signed_certificate(
        &foreign,
        "Foreign Deployment",
        custody::DEFAULT_VALIDITY,
    )
    .expect("foreign certificate");
    let foreign_anchor =
        load_trust_anchor(&custody::certificate_der(&foreign_cert).expect("der")).expect("anchor");

    assert_eq!(
        verify_document(&destination, &foreign_anchor).expect("verification"),
        VerificationOutcome::Invalid
    );
}

#[test]
fn test_signed_range_excludes_the_block() {
    let deployment = setup_deployment();
    let docs = tempdir().expect("document dir");

    let private_key = unlock_private_key(&deployment.artifact_path, PIN).expect("unlock");
    let certificate = custody::issue_self_signed_certificate(
        test_keypair(),
        "Integration Suite",
        custody::DEFAULT_VALIDITY,
    )
    .expect("certificate");

    let source = write_pdf(&docs, "report.pdf", b"report body\n");
    let destination = docs.path().join("report-signed.pdf");
    sign_document(&source, &destination, &private_key, &certificate).expect("signing");

    let signed = fs::read(&destination).expect("read back");
    let handle = verify::extract_signature(&signed)
        .expect("scan")
        .expect("signature present");

    // The covered range is everything before the block, and the original
    // content is preserved byte for byte inside it
    assert!(handle.signed_len < signed.len());
    assert!(signed[..handle.signed_len]
        .windows(11)
        .any(|w| w == b"report body"));
}
