//! The backend for the Nigerian Association of Urological Surgeons' membership portal.

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod file;
pub mod graphql;
pub mod models;
pub mod state;
pub mod store;
pub mod util;
