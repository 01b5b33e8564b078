//! Common test utilities for vodcast-dl integration tests

#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod workspace;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use workspace::*;
