//! Common test utilities shared by the integration tests.
//!
//! - Fixtures (form input, configured workflows)
//! - A navigator that records where it was sent
//! - State assertions

pub mod assertions;
pub mod fixtures;
pub mod navigator;

#[allow(unused_imports)]
pub use assertions::*;
pub use fixtures::*;
#[allow(unused_imports)]
pub use navigator::*;
