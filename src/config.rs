// This project was developed with assistance from GitHub Copilot
// Command-line and environment configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::db::DEFAULT_DB_FILE;
use crate::key_management::SeedPolicy;

#[derive(Debug, Clone, Parser)]
#[command(name = "jwks-server")]
#[command(about = "JWKS server issuing RS256 tokens from SQLite-stored keys")]
#[command(version)]
pub struct Config {
    /// SQLite database holding the signing keys
    #[arg(long, env = "JWKS_DB_PATH", default_value = DEFAULT_DB_FILE)]
    pub db_path: PathBuf,

    /// Address to listen on
    #[arg(long, env = "JWKS_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Key seeding performed at startup
    #[arg(long, env = "JWKS_SEED", value_enum, default_value_t = SeedPolicy::Always)]
    pub seed: SeedPolicy,

    /// RSA modulus size for generated keys
    #[arg(long, env = "JWKS_KEY_BITS", default_value_t = 2048)]
    pub key_bits: usize,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "JWKS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}
