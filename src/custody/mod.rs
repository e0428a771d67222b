/*!
 * Key custody: keypair generation, PIN-sealed private-key artifacts, and
 * self-signed certificate issuance
 *
 * This module owns the RSA keypair from generation until both custody
 * artifacts are exported: the public artifact (public key + certificate,
 * fixed storage) and the private artifact (PIN-sealed private key,
 * removable media).
 */

mod custody;

pub use custody::*;

#[cfg(test)]
pub(crate) mod tests;
