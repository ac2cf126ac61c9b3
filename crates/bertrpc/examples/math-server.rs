//! The `math` module from the BERT-RPC examples, served over TCP.
//!
//! Run with:
//!   cargo run --example math-server
//!
//! In another terminal:
//!   cargo run --example math-client
//! or
//!   cargo run --features cli -- call localhost:7001 math avg --args '[[1,2,3,4]]'

use bertrpc::demos;
use bertrpc::rpc::{ModuleRegistry, Server};
use bertrpc::transport::Endpoint;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let endpoint: Endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:7001".to_string())
        .parse()?;

    let registry = ModuleRegistry::new().with_module("math", demos::math());
    let server = Server::bind(&endpoint, registry)?;
    eprintln!("Listening on {}", server.local_endpoint());

    server.serve()?;
    Ok(())
}
