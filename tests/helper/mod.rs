//! Shared test utilities

#![allow(dead_code)]

pub mod mirrors;
pub mod transport;

pub use mirrors::{FakeMirror, GOOD_CONTENT, serve_all};
pub use transport::{FakeTransport, sha256};
