#![doc = "The `todolist` library crate."]
#![doc = ""]
#![doc = "Domain models, due-date parsing, session tokens, the task and account"]
#![doc = "managers, their storage backends and the HTTP routes. The binary in"]
#![doc = "`main.rs` wires these into an actix-web server."]

pub mod auth;
pub mod config;
pub mod dates;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use error::{AppError, AuthError};
pub use state::AppState;
