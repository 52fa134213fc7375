//! Crate-wide error type.
//!
//! Only the module driver and the AST-pass layer surface errors; the
//! structurizer itself operates on input guaranteed well-formed by the
//! lifting front-end and treats internal inconsistencies as fatal panics.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A lifted function failed driver-level validation before
    /// structurization.
    #[error("invalid CFG for {function}: {message}")]
    InvalidCfg { function: String, message: String },

    /// An AST pass reported a failure.
    #[error("AST pass {pass} failed: {message}")]
    Pass { pass: String, message: String },
}
