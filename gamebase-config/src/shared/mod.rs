mod cluster;
mod sentry;

pub use cluster::*;
pub use sentry::*;
