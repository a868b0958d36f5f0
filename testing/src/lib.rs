//! Testing utilities for the Wayfarer lifecycle architecture.
//!
//! Provides the [`ReducerTest`] Given-When-Then harness used to test every
//! reducer in the workspace, plus common effect assertions.


pub use reducer_test::{ReducerTest, assertions};
