pub mod response;
pub mod rest;

pub use response::ScanResponse;
pub use rest::router;
