pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod notify;
pub mod observability;
pub mod phone;
pub mod startup;
pub mod state;
pub mod store;
pub mod tracking;
