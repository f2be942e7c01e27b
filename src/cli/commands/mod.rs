pub mod config;
pub mod nonce;
pub mod routes;
pub mod schema;
pub mod server;
