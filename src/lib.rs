pub mod api;
pub mod certificate;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod log;
pub mod merkle;
pub mod sct;
pub mod verification;

pub use error::CtError;
