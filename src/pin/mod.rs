/*!
 * PIN digest derivation
 *
 * This module reduces the user's numeric PIN to a fixed-length SHA-256
 * digest that is used directly as the symmetric key for sealing the
 * private-key artifact.
 */

mod pin;

pub use pin::*;
