pub mod complete;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;

pub use complete::complete;
pub use convert::{Conversion, convert};
pub use document::{Dialect, SpecDocument};
pub use error::{ConfigError, SpecError};
