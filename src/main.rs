use anyhow::Result;

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    toolchat::cli::run().await
}
