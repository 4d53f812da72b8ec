pub mod api;
pub mod error;
pub mod models;
pub mod schema;
pub mod seed;
pub mod stock;
pub mod store;
pub mod tables;
pub mod workflow;
