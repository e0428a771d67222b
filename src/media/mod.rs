/*!
 * Removable-media presence signal
 *
 * Models only the contract the signing flow needs from the platform's
 * device-change machinery: is the private artifact reachable right now, and
 * did it appear or disappear since we last looked. OS-level device
 * enumeration lives outside the crate; callers feed [`MediaWatcher`] the
 * artifact path and poll it from whatever event loop they run.
 */

mod media;
pub use media::*;
