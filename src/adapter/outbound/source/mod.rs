//! Source platform adapters.

pub mod http;
pub mod manual;

pub use http::HttpSource;
pub use manual::ManualSource;
