//! Bridge between the UI thread and the backend worker that performs I/O.

pub mod commands;
pub mod runtime;
