#![forbid(unsafe_code)]

//! Program text to syntax tree.
//!
//! Statements end in `;`, keywords are upper-case, and `--` starts a comment
//! that runs to the end of the line. Every error carries the 1-based line and
//! column of the offending token.

pub mod keywords;
pub mod lexer;
mod parser;

pub use parser::{parse_expr, parse_program};
