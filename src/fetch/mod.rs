//! Network access for mirrors
//!
//! # Modules
//!
//! - [`transport`]: `Transport` trait (page fetch, speed probe, download)
//! - [`http`]: reqwest implementation
//! - [`session`]: Run-scoped session with page cache and cancellation
//! - [`links`]: Hyperlink extraction from HTML pages
//! - [`error`]: Transport errors

pub mod error;
pub mod http;
pub mod links;
pub mod session;
pub mod transport;

pub use error::FetchError;
pub use http::HttpTransport;
pub use session::{FetchSession, Page, PageCache};
pub use transport::{Probe, Transport};
