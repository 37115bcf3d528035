//! marmot-exec: Exec key grammar and command-line assembly.
//!
//! Turns the Exec template of a desktop entry into an argument vector
//! (validation, tokenization, field-code expansion) and assembles argument
//! vectors into correctly quoted shell invocations.

pub mod assemble;
pub mod grammar;

pub use assemble::{argv_to_string, build_invocation, sq_quote, wrap_in_shell, wrap_in_wrapper};
pub use assemble::{Invocation, InvocationOptions};
pub use grammar::{expand, tokenize, validate, EntryQuirks, FieldContext};

/// Errors produced while handling an Exec template.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("invalid Exec field: {0}")]
    InvalidExec(String),
}
