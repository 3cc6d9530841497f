pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod global;
pub mod interview;
