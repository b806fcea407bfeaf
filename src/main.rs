// This project was developed with assistance from GitHub Copilot
// Educational JWKS server implementation
//
// A RESTful JWKS (JSON Web Key Set) server backed by SQLite. It publishes the
// public halves of unexpired RSA keys and issues RS256 JWTs, optionally signed
// with an expired key so clients can test their expiry handling.

use clap::Parser;
use jwks::{config::Config, server, telemetry};

#[tokio::main]
async fn main() {
    let config = Config::parse();
    telemetry::init_tracing(&config.log_level);

    if let Err(e) = server::start_server(config).await {
        tracing::error!(kind = e.kind(), error = %e, "server error");
        std::process::exit(1);
    }
}
