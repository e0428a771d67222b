/*!
 * Byte-level PDF plumbing: header detection, the appended signature-field
 * marker, and the embedded signature-block wire format
 *
 * Everything Pensign adds to a document is appended after the document's
 * final `%%EOF` as PDF comment lines, which conforming readers ignore. The
 * original bytes stay byte-for-byte intact up to the appended increment,
 * which is what makes the signature verifiable against the exact prior
 * content.
 */

mod pdf;

pub use pdf::*;
