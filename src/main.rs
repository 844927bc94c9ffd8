//! vibecon - Per-workspace persistent Docker containers for AI coding agents

use clap::Parser;

use vibecon::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match cli.run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
