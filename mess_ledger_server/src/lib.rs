pub mod config;
pub mod data_objects;
pub mod errors;
pub mod reset_worker;
pub mod routes;
pub mod server;
