pub mod app;
pub mod config;
pub mod domain;
pub mod driver;
pub mod error;
pub mod obd;
pub mod pdo;
pub mod store;
