//! Infrastructure configuration modules.

pub mod fees;
pub mod logging;
pub mod service;
pub mod settings;

pub use settings::Config;
