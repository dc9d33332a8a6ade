//! Version parsing and comparison
//!
//! Mirrors publish versions in many shapes (`2024.01.01`, `23H2`, `1.2-rc3`,
//! `38`). A [`Version`] tokenizes any of them into numeric and alphabetic
//! runs and orders them consistently so the newest release can be picked
//! across sources.
//!
//! # Modules
//!
//! - [`token`]: Token type and tokenizer
//! - [`parsed`]: The [`Version`] type
//! - [`error`]: Error type for rejected inputs

pub mod error;
pub mod parsed;
pub mod token;

pub use error::InvalidVersionError;
pub use parsed::{DEFAULT_SEPARATOR, Version};
pub use token::Token;
