use serde::{Deserialize, Serialize};

use crate::error::{error_codes, PensignError, PensignResult};

/// Leading bytes of every PDF file
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Marker appended to a document when its signature field is reserved
///
/// Appended verbatim at the end of the file; the leading newline closes the
/// preceding line regardless of how the document ends.
pub const FIELD_MARKER: &[u8] = b"\n%%PensignSignatureField\n";

/// Marker opening the embedded signature block
pub const SIG_MARKER: &[u8] = b"%%PensignSignature: ";

/// Trailer closing the embedded signature block
pub const BLOCK_TRAILER: &[u8] = b"\n%%EOF\n";

/// Digest algorithm identifier recorded in every signature block
pub const DIGEST_ALGORITHM: &str = "sha2-256";

/// An embedded document signature and the certificate that produced it
///
/// Serialized with bincode, base64-armored, and embedded between
/// [`SIG_MARKER`] and [`BLOCK_TRAILER`]. The signature covers every byte of
/// the document preceding the block, binding it to that exact revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBlock {
    /// Digest algorithm used over the signed range
    pub digest_algorithm: String,
    /// PKCS#1 v1.5 signature over the signed range
    pub signature: Vec<u8>,
    /// DER encoding of the signer's certificate
    pub certificate_der: Vec<u8>,
}

/// Check whether the bytes look like a PDF document
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Offset of the last occurrence of `needle` in `haystack`
fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).rev().find(|&i| &haystack[i..i + needle.len()] == needle)
}

/// Offset of the reserved signature field, if one is present
///
/// Searches from the end: the reservation is always the last appended
/// increment, and document content is free to contain the marker bytes.
pub fn find_field_offset(bytes: &[u8]) -> Option<usize> {
    rfind(bytes, FIELD_MARKER)
}

/// Offset of the embedded signature block, if one is present
pub fn find_signature_offset(bytes: &[u8]) -> Option<usize> {
    rfind(bytes, SIG_MARKER)
}

/// Encode a signature block into its appendable byte form
pub fn encode_signature_block(block: &SignatureBlock) -> PensignResult<Vec<u8>> {
    let payload = bincode::serialize(block)
        .map_err(|e| PensignError::Serialization(format!("signature block encoding: {}", e)))?;
    let armored = base64::encode(&payload);

    let mut out = Vec::with_capacity(SIG_MARKER.len() + armored.len() + BLOCK_TRAILER.len());
    out.extend_from_slice(SIG_MARKER);
    out.extend_from_slice(armored.as_bytes());
    out.extend_from_slice(BLOCK_TRAILER);
    Ok(out)
}

/// Locate and decode the embedded signature block
///
/// Returns `Ok(None)` when the document carries no signature marker at all
/// ("nothing to verify"). A marker that is present but whose block is
/// truncated or malformed is an error with code `SIGNATURE_BLOCK_MALFORMED`;
/// callers in the verification path treat that as a tampered signature,
/// never as an absent one.
///
/// On success returns the offset where the block starts - the signed range
/// is exactly `bytes[..offset]` - and the decoded block.
pub fn parse_signature_block(bytes: &[u8]) -> PensignResult<Option<(usize, SignatureBlock)>> {
    let offset = match find_signature_offset(bytes) {
        Some(offset) => offset,
        None => return Ok(None),
    };

    let malformed = |cause: &str| {
        PensignError::invalid_document(cause, error_codes::SIGNATURE_BLOCK_MALFORMED)
    };

    let rest = &bytes[offset + SIG_MARKER.len()..];
    let newline = rest
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| malformed("signature block is truncated"))?;

    // The block must be the final increment of the file
    if &rest[newline..] != BLOCK_TRAILER {
        return Err(malformed("signature block trailer is damaged"));
    }

    let armored = std::str::from_utf8(&rest[..newline])
        .map_err(|_| malformed("signature block armor is not valid text"))?;
    let payload =
        base64::decode(armored).map_err(|_| malformed("signature block armor is damaged"))?;

    let block: SignatureBlock = bincode::deserialize(&payload)
        .map_err(|_| malformed("signature block payload does not decode"))?;

    Ok(Some((offset, block)))
}
