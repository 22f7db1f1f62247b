//! Stepped debugger for a small formula language.
//!
//! A formula is parsed into an [`parser::ExpressionNode`] tree and evaluated one entry or
//! exit at a time by a [`debugger::FormulaDebugger`], which keeps a call stack, an
//! execution trace and a single active breakpoint.

pub mod config;
pub mod dap;
pub mod debugger;
pub mod error;
pub mod executor;
pub mod parser;
pub mod value;
