pub mod client;
pub mod error;
pub mod retry;

pub use campcook_api_types;
pub use client::CollectorClient;
pub use error::ClientError;
pub use retry::RetryConfig;
