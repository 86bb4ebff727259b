//! Common test utilities for profile-harvester integration tests

#[allow(dead_code)]
pub mod fetchers;
#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fetchers::*;
#[allow(unused_imports)]
pub use fixtures::*;
