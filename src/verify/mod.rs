/*!
 * Signature verification engine
 *
 * Loads the exported certificate as the single trust anchor, extracts the
 * embedded signature from a document, and validates it. Verification is
 * independent of the signing side: it consumes only the public artifact and
 * the document bytes.
 */

mod verify;

pub use verify::*;
