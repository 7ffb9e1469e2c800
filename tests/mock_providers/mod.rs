//! Mock provider servers for integration tests.
//!
//! Each integration test binary compiles this module separately, so helpers a
//! given binary does not use are expected.

#![allow(dead_code)]

pub mod volcengine_mock;

pub use volcengine_mock::{MockBehavior, VolcengineMock};
