#![doc = "The `taskdeck` library crate."]
#![doc = ""]
#![doc = "Accounts (password and OAuth sign-in, JWT access/refresh tokens) and tasks whose status"]
#![doc = "follows their time window. The binary in `main.rs` wires these pieces to PostgreSQL and"]
#![doc = "an actix-web server; tests wire them to the in-memory stores."]

pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod uploads;

pub use error::AppError;
pub use state::AppState;
