pub mod config;
pub mod db;
pub mod delivery;
pub mod model;
pub mod providers;
pub mod scheduler;
pub mod server;
pub mod settings;
pub mod store;
