pub mod config;
pub mod console_log;
pub mod demo_source;
pub mod f1_fetch;
pub mod feed;
pub mod http_client;
pub mod presentation;
pub mod state;
