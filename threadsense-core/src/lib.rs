pub mod config;
pub mod error;
pub mod error_utils;
pub mod testing;
pub mod transport;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use transport::*;
pub use types::*;
