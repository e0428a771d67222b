use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use log::info;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use x509_cert::builder::{Builder, CertificateBuilder, Profile};
use x509_cert::der::pem::LineEnding;
use x509_cert::der::{Decode, Encode, EncodePem};
use x509_cert::ext::pkix::{KeyUsage, KeyUsages};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::Validity;
use x509_cert::Certificate;
use zeroize::Zeroizing;

use crate::aes;
use crate::error::{error_codes, PensignError, PensignResult};
use crate::pin::PinDigest;
use crate::utils;

/// RSA modulus size for generated signing keypairs, in bits
pub const RSA_KEY_BITS: usize = 4096;

/// Smallest modulus size accepted by [`SigningKeypair::generate_bits`]
pub const RSA_KEY_BITS_MIN: usize = 2048;

/// Certificate validity window: ten years from issuance
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Leading magic of a private-key artifact file
///
/// Identifies the file as a Pensign-sealed key so that a corrupted or
/// foreign file is rejected structurally instead of being reported as a
/// wrong PIN.
pub const ARTIFACT_MAGIC: &[u8] = b"PSK1";

/// File name of the public-key half of the public artifact
pub const PUBLIC_KEY_FILE: &str = "pensign_public_key.pem";

/// File name of the certificate half of the public artifact
pub const CERTIFICATE_FILE: &str = "pensign_certificate.pem";

/// File name of the private-key artifact on removable media
pub const PRIVATE_ARTIFACT_FILE: &str = "pensign_private_key.bin";

/// An RSA signing keypair under exclusive in-memory custody
///
/// The keypair exists only inside this struct until both custody artifacts
/// are exported; afterwards the filesystem copies are authoritative and this
/// value can be dropped. The private half is zeroed from memory on drop by
/// the underlying `rsa` types.
#[derive(Clone)]
pub struct SigningKeypair {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl std::fmt::Debug for SigningKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeypair")
            .field("private_key", &"[RSA private key]")
            .field("bits", &(self.public_key.size() * 8))
            .finish()
    }
}

impl SigningKeypair {
    /// Generate a fresh RSA-4096 signing keypair
    ///
    /// Uses the operating system's cryptographically secure random source.
    /// This is the longest single operation in the crate and should be run
    /// off any latency-sensitive thread by the caller.
    ///
    /// # Errors
    ///
    /// `KeyGeneration` on entropy or algorithm failure. Generation failures
    /// are fatal to the current operation; they are not transient and must
    /// not be retried automatically.
    pub fn generate() -> PensignResult<Self> {
        Self::generate_bits(RSA_KEY_BITS)
    }

    /// Generate a keypair with an explicit modulus size
    ///
    /// Production callers use [`SigningKeypair::generate`]; the explicit
    /// size exists for test suites where RSA-4096 generation is too slow.
    /// Sizes below [`RSA_KEY_BITS_MIN`] are rejected.
    pub fn generate_bits(bits: usize) -> PensignResult<Self> {
        if bits < RSA_KEY_BITS_MIN {
            return Err(PensignError::KeyGeneration {
                cause: format!("modulus of {} bits is below the {} bit minimum", bits, RSA_KEY_BITS_MIN),
                error_code: error_codes::KEY_SIZE_TOO_SMALL,
            });
        }

        let mut rng = rand::rngs::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, bits).map_err(|e| {
            PensignError::key_generation(
                &format!("RSA key generation failed: {}", e),
                error_codes::KEY_GENERATION_FAILED,
            )
        })?;
        let public_key = RsaPublicKey::from(&private_key);

        info!("generated RSA-{} signing keypair", bits);

        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// Borrow the private half
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// Borrow the public half
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Serialize the public key as SPKI PEM
    pub fn public_key_pem(&self) -> PensignResult<String> {
        self.public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| {
                PensignError::key_generation(
                    &format!("public key serialization failed: {}", e),
                    error_codes::KEY_SERIALIZATION_FAILED,
                )
            })
    }

    /// Serialize the private key as PKCS#8 DER
    ///
    /// The returned buffer is zeroed on drop; it exists only as the
    /// plaintext input to [`encrypt_private_key`].
    pub(crate) fn private_key_der(&self) -> PensignResult<Zeroizing<Vec<u8>>> {
        let document = self.private_key.to_pkcs8_der().map_err(|e| {
            PensignError::key_generation(
                &format!("private key serialization failed: {}", e),
                error_codes::KEY_SERIALIZATION_FAILED,
            )
        })?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }
}

/// Encrypt the private key under a PIN digest
///
/// Produces the complete private-artifact byte layout:
/// `ARTIFACT_MAGIC || nonce || AES-GCM(pkcs8-der)`. The nonce is embedded so
/// decryption needs nothing beyond the artifact and the digest.
///
/// # Arguments
///
/// * `digest` - The PIN digest used as AES-256 key material
/// * `keypair` - The keypair whose private half is being sealed
pub fn encrypt_private_key(
    digest: &PinDigest,
    keypair: &SigningKeypair,
) -> PensignResult<Vec<u8>> {
    let plaintext = keypair.private_key_der()?;
    let sealed = aes::seal(digest, &plaintext)?;

    let mut artifact = Vec::with_capacity(ARTIFACT_MAGIC.len() + sealed.len());
    artifact.extend_from_slice(ARTIFACT_MAGIC);
    artifact.extend_from_slice(&sealed);
    Ok(artifact)
}

/// Decrypt and import the private key from an artifact
///
/// PIN correctness is not checked separately: the digest either authenticates
/// the AES-GCM envelope and the plaintext parses as a PKCS#8 private key, or
/// the whole operation fails as [`PensignError::IncorrectPin`]. Key recovery
/// and PIN verification are one operation with one failure mode.
///
/// # Errors
///
/// * `InvalidParameter` if the artifact does not carry the Pensign magic
///   (a corrupted or foreign file, distinct from a wrong PIN).
/// * `IncorrectPin` if authentication or key parsing fails.
pub fn decrypt_private_key(digest: &PinDigest, artifact: &[u8]) -> PensignResult<RsaPrivateKey> {
    if !artifact.starts_with(ARTIFACT_MAGIC) {
        return Err(PensignError::invalid_parameter(
            "artifact",
            "a Pensign private-key artifact",
            "unrecognized leading bytes",
        ));
    }

    let plaintext = Zeroizing::new(aes::open(digest, &artifact[ARTIFACT_MAGIC.len()..])?);

    // Structural validity of the decrypted bytes is the final PIN check
    RsaPrivateKey::from_pkcs8_der(&plaintext).map_err(|_| PensignError::IncorrectPin)
}

/// Issue a self-signed certificate binding the public key to an identity
///
/// Issuer equals subject; the certificate body is signed with the same
/// private key it certifies (SHA-256, PKCS#1 v1.5). The serial number is
/// derived from the issuance timestamp, key usage is declared as
/// digital-signature plus non-repudiation, and the validity window starts
/// now and runs for `validity` (see [`DEFAULT_VALIDITY`]). No CA or chain
/// is modeled; this certificate is the sole trust anchor.
///
/// # Arguments
///
/// * `keypair` - The keypair being certified; its private half signs
/// * `common_name` - The subject identity, placed in the CN attribute
/// * `validity` - Validity duration from the moment of issuance
///
/// # Errors
///
/// `Certificate` with code `CERTIFICATE_ISSUANCE_FAILED` if the subject
/// name, validity window, or signature cannot be produced. Issuance
/// failures are fatal to the current operation.
pub fn issue_self_signed_certificate(
    keypair: &SigningKeypair,
    common_name: &str,
    validity: Duration,
) -> PensignResult<Certificate> {
    let issuance = |e: String| {
        PensignError::certificate_error("issue", &e, error_codes::CERTIFICATE_ISSUANCE_FAILED)
    };

    let subject =
        Name::from_str(&format!("CN={}", common_name)).map_err(|e| issuance(e.to_string()))?;

    let serial = serial_from_issuance_time().map_err(|e| issuance(e.to_string()))?;

    let validity = Validity::from_now(validity).map_err(|e| issuance(e.to_string()))?;

    let public_key_der = keypair
        .public_key
        .to_public_key_der()
        .map_err(|e| issuance(e.to_string()))?;
    let spki = SubjectPublicKeyInfoOwned::from_der(public_key_der.as_bytes())
        .map_err(|e| issuance(e.to_string()))?;

    let signer = rsa::pkcs1v15::SigningKey::<Sha256>::new(keypair.private_key.clone());

    // Manual profile with no issuer: issuer is copied from the subject,
    // and no CA extensions are attached
    let mut builder = CertificateBuilder::new(
        Profile::Manual { issuer: None },
        serial,
        validity,
        subject,
        spki,
        &signer,
    )
    .map_err(|e| issuance(e.to_string()))?;

    builder
        .add_extension(&KeyUsage(
            KeyUsages::DigitalSignature | KeyUsages::NonRepudiation,
        ))
        .map_err(|e| issuance(e.to_string()))?;

    let certificate = builder
        .build::<rsa::pkcs1v15::Signature>()
        .map_err(|e| issuance(e.to_string()))?;

    info!(
        "issued self-signed certificate for CN={} (serial {})",
        common_name,
        utils::to_hex(certificate.tbs_certificate.serial_number.as_bytes())
    );

    Ok(certificate)
}

/// Derive a certificate serial number from the issuance time
///
/// Seconds since the Unix epoch, big-endian with leading zero bytes
/// stripped. Unique enough for a single-anchor deployment where at most one
/// certificate per second is issued.
fn serial_from_issuance_time() -> Result<SerialNumber, x509_cert::der::Error> {
    let timestamp = Utc::now().timestamp().max(1) as u64;
    let bytes = timestamp.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    SerialNumber::new(&bytes[first..])
}

/// The public custody artifact: public key and certificate, PEM-serialized
///
/// Written once to fixed storage at creation time and read-only afterwards.
#[derive(Debug, Clone)]
pub struct PublicArtifact {
    pub public_key_pem: String,
    pub certificate_pem: String,
}

impl PublicArtifact {
    /// Write both halves into `dir` under the fixed file names
    pub fn write_to(&self, dir: &Path) -> PensignResult<()> {
        fs::write(dir.join(PUBLIC_KEY_FILE), &self.public_key_pem)?;
        fs::write(dir.join(CERTIFICATE_FILE), &self.certificate_pem)?;
        info!("public artifact written to {}", dir.display());
        Ok(())
    }

    /// Read both halves back from `dir`
    pub fn load_from(dir: &Path) -> PensignResult<Self> {
        let public_key_pem = fs::read_to_string(dir.join(PUBLIC_KEY_FILE))?;
        let certificate_pem = fs::read_to_string(dir.join(CERTIFICATE_FILE))?;
        Ok(Self {
            public_key_pem,
            certificate_pem,
        })
    }

    /// Path of the certificate file inside `dir`
    pub fn certificate_path(dir: &Path) -> PathBuf {
        dir.join(CERTIFICATE_FILE)
    }
}

/// Export the public artifact: pure serialization, no cryptographic work
pub fn export_public_artifact(
    keypair: &SigningKeypair,
    certificate: &Certificate,
) -> PensignResult<PublicArtifact> {
    let certificate_pem = certificate.to_pem(LineEnding::LF).map_err(|e| {
        PensignError::certificate_error(
            "export",
            &e.to_string(),
            error_codes::CERTIFICATE_ISSUANCE_FAILED,
        )
    })?;

    Ok(PublicArtifact {
        public_key_pem: keypair.public_key_pem()?,
        certificate_pem,
    })
}

/// Write the private artifact to removable media: pure persistence
///
/// `encrypted_private_key` is the output of [`encrypt_private_key`]; this
/// function performs no cryptographic work.
pub fn export_private_artifact(dir: &Path, encrypted_private_key: &[u8]) -> PensignResult<PathBuf> {
    let path = dir.join(PRIVATE_ARTIFACT_FILE);
    fs::write(&path, encrypted_private_key)?;
    info!("private artifact written to {}", path.display());
    Ok(path)
}

/// Serialize a certificate to DER for embedding into a signature block
pub fn certificate_der(certificate: &Certificate) -> PensignResult<Vec<u8>> {
    certificate.to_der().map_err(|e| {
        PensignError::certificate_error(
            "serialize",
            &e.to_string(),
            error_codes::CERTIFICATE_PARSE_FAILED,
        )
    })
}
