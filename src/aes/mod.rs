/*!
 * AES-GCM sealing of the private-key artifact
 *
 * This module implements the PIN-derived symmetric encryption used to
 * protect the private key while it rests on removable media.
 */

mod aes;

pub use aes::*;
