mod catalog;
mod cli;
mod client;
mod error;
mod protocol;
mod server;
mod session;
mod size;

use anyhow::{Context, Result};
use catalog::Catalog;
use clap::Parser;
use cli::{Cli, Commands};
use client::{Client, ClientConfig};
use protocol::Limits;
use server::ServerConfig;
use tokio::fs;
use tokio::io::BufReader;
use tracing::Level;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve {
            path,
            host,
            port,
            exclude,
        } => {
            let catalog = Catalog::build(&path, &exclude)?;
            let config = ServerConfig {
                host,
                port,
                limits: Limits::default(),
            };
            server::run_server(catalog, config).await?;
        }
        Commands::Connect { output, host, port } => {
            if !output.exists() {
                fs::create_dir_all(&output)
                    .await
                    .with_context(|| format!("cannot create {:?}", output))?;
            }
            let server = server::resolve(&host, port)
                .await
                .with_context(|| format!("cannot resolve {host}:{port}"))?;
            let config = ClientConfig {
                server,
                output_dir: output,
                limits: Limits::default(),
            };

            let input = BufReader::new(tokio::io::stdin());
            Client::new(config, input, std::io::stdout()).run().await?;
        }
        Commands::Catalog {
            path,
            exclude,
            json,
        } => {
            let catalog = Catalog::build(&path, &exclude)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
            } else {
                print!("{}", catalog.render());
            }
        }
    }

    Ok(())
}
