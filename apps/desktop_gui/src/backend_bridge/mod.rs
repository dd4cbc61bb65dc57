//! Backend bridge: command queue types and the worker thread that owns the
//! async runtime.

pub mod commands;
pub mod runtime;
