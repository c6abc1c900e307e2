pub mod config;
pub mod errors;
pub mod models;
pub mod observability;
pub mod providers;
pub mod resolver;
pub mod services;
pub mod storage;
pub mod utils;
pub mod web;
