pub mod config;
pub mod http;

pub use config::Config;
pub use http::HttpBackend;
