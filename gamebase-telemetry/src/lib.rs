//! Tracing setup shared by the gamebase binaries and their tests.

pub mod tracing;

pub use crate::tracing::{LogFlusher, TracingError, init_test_tracing, init_tracing};
