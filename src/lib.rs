// This project was developed with assistance from GitHub Copilot
// Library module for JWKS server

pub mod config;
pub mod credentials;
pub mod db;
pub mod discovery;
pub mod endpoints;
pub mod error;
pub mod issuer;
pub mod key_management;
pub mod server;
pub mod telemetry;
pub mod types;
