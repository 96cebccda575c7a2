//! Try-on compositor CLI tool

use tryon_compositor::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}
