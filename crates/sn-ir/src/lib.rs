//! Core IR types for sonify.
//!
//! This crate defines the expression tree that user-authored functions
//! are parsed into, the evaluator that interprets it at a given time,
//! and the time window a function occupies on the timeline. The parser
//! emits IR, and the playback engine consumes IR.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod eval;
mod expr;
mod latex;
mod window;

pub use eval::{evaluate, evaluate_at_t, pos_mod, EvalContext, EvalError, MAX_BINDINGS, TIME_VARIABLE};
pub use expr::{Children, Expr};
pub use window::{TimeWindow, WindowError};
