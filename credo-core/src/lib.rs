pub mod app;
pub mod auth;
pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod mail;
pub mod migrations;
pub mod models;
pub mod openapi;
pub mod response;
pub mod services;
pub mod store;
pub mod testing;

pub use app::App;
pub use config::Config;
pub use error::AuthError;
pub use response::ServiceResponse;
pub use testing::{TestApp, TestClient, TestResponse};
