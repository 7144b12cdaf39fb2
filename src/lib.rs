pub mod app;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod loader;
pub mod output;
pub mod scope;
pub mod store;
