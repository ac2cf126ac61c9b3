//! Pipelined calls against `math-server`.
//!
//! Run with:
//!   cargo run --example math-client [ENDPOINT]

use bertrpc::rpc::{Client, Request};
use bertrpc::transport::Endpoint;
use bertrpc::Term;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let endpoint: Endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:7001".to_string())
        .parse()?;
    let client = Client::connect(&endpoint)?;

    let values = Term::list((1..=10).map(Term::from));
    let math = client.module("math");
    println!("sum = {}", math.call("sum", vec![values.clone()])?);
    println!("avg = {}", math.call("avg", vec![values])?);

    // Several requests in flight at once; replies come back in order.
    let pending: Vec<_> = (1..=5)
        .map(|n| {
            let values = Term::list((1..=n).map(Term::from));
            client.send(&Request::call("math", "sum", vec![values]))
        })
        .collect::<Result<_, _>>()?;
    for (n, reply) in (1..=5).zip(pending) {
        println!("sum(1..={n}) = {}", reply.wait()?);
    }

    client.close();
    Ok(())
}
