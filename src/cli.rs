use crate::server::DEFAULT_PORT;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log more (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the files of a directory
    Serve {
        /// Directory whose files are offered
        path: PathBuf,
        /// Host name to resolve and listen on
        #[arg(long, default_value = "localhost")]
        host: String,
        /// Port to listen on
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Glob patterns of file names to leave out
        #[arg(long)]
        exclude: Vec<String>,
    },
    /// Connect to a server and fetch files interactively
    Connect {
        /// Directory to save received files
        output: PathBuf,
        /// Server host name
        #[arg(long, default_value = "localhost")]
        host: String,
        /// Server port
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Print the catalog a server would offer for a directory
    Catalog {
        /// Directory to scan
        path: PathBuf,
        /// Glob patterns of file names to leave out
        #[arg(long)]
        exclude: Vec<String>,
        /// Print JSON instead of the wire listing
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_defaults_to_the_well_known_port() {
        let cli = Cli::try_parse_from(["fileserve", "serve", "files"]).unwrap();
        match cli.command {
            Commands::Serve {
                path,
                host,
                port,
                exclude,
            } => {
                assert_eq!(path, PathBuf::from("files"));
                assert_eq!(host, "localhost");
                assert_eq!(port, 11000);
                assert!(exclude.is_empty());
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn verbosity_counts_and_excludes_repeat() {
        let cli = Cli::try_parse_from([
            "fileserve", "-vv", "catalog", "dir", "--exclude", "*.tmp", "--exclude", "*.bak",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Catalog { exclude, json, .. } => {
                assert_eq!(exclude, vec!["*.tmp", "*.bak"]);
                assert!(json);
            }
            _ => panic!("expected catalog"),
        }
    }
}
