pub mod config;
pub mod logging;
pub mod provider;
pub mod store;
pub mod stub;
pub mod task;
pub mod template;
pub mod web;
