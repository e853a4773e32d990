//! Command-line interface

pub mod create_key;
pub mod serve;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vqa-gateway", version, about = "Visual question answering service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the API server
    Serve,
    /// Issue a new API key and print the one-time plaintext secret
    CreateKey,
}
