pub mod service;


pub use service::{ScanService, ScanSummary};
