/*!
 * Document signing engine
 *
 * Drives one document through the forward-only signing state machine:
 * `Unsigned -> FieldReserved -> Signed`. Each step reads the durable output
 * of the previous one; a document that already carries a signature is
 * refused outright.
 */

mod document;

pub use document::*;

#[cfg(test)]
mod tests;
