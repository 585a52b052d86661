//! Runs one request through the event pipeline against a seeded in-memory
//! catalog and prints the reply.

mod cli;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run().await
}
