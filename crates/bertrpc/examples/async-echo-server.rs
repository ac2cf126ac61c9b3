//! The `echo` module served on tokio.
//!
//! Run with:
//!   cargo run --example async-echo-server --features async
//!
//! Then:
//!   cargo run --features cli -- call localhost:7000 echo echo --args '[1, "two", [3]]'

use bertrpc::demos;
use bertrpc::rpc::{AsyncServer, ModuleRegistry};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:7000".to_string());
    let listener = TcpListener::bind(&addr).await?;
    eprintln!("Listening on {}", listener.local_addr()?);

    let server = AsyncServer::new(ModuleRegistry::new().with_module("echo", demos::echo()));
    tokio::select! {
        result = server.serve(listener) => result?,
        _ = tokio::signal::ctrl_c() => eprintln!("Interrupted"),
    }
    Ok(())
}
