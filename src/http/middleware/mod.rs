//! Interceptors that shape responses rather than guard requests.

pub mod access_log;
pub mod cache_control;
pub mod compression;

pub use access_log::AccessLog;
pub use cache_control::CacheControl;
pub use compression::Compression;
