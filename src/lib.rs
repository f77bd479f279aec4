pub mod config;
pub mod error;
pub mod http;
pub mod manager;
pub mod output;
pub mod package;
pub mod process;
pub mod registry;
pub mod services;
