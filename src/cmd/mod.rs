use std::path::PathBuf;

use crate::{pkg::server::listen, prelude::Result};
use clap::{Parser, Subcommand};

mod migrate;
mod verify;

#[derive(Parser)]
#[command(about = "resume verification ledger with ai scoring")]
struct Cmd {
    #[command(subcommand)]
    command: Option<SubCommandType>,
}

#[derive(Subcommand)]
enum SubCommandType {
    /// serve the http api
    Listen,
    /// prepare the ledger database
    Migrate,
    /// print the sha-256 digest of a resume
    Digest { file: PathBuf },
    /// hash, score and record a resume on the ledger
    Verify {
        file: PathBuf,
        #[command(flatten)]
        job: verify::JobArgs,
        /// leave the wallet disconnected; the submission is refused
        #[arg(long)]
        no_wallet: bool,
    },
    /// look up a digest on the ledger
    Lookup { resume_hash: String },
}

pub async fn run() -> Result<()> {
    let args = Cmd::parse();
    match args.command {
        Some(SubCommandType::Listen) => {
            listen().await?;
        }
        Some(SubCommandType::Migrate) => {
            migrate::apply().await?;
        }
        Some(SubCommandType::Digest { file }) => {
            verify::digest(file).await?;
        }
        Some(SubCommandType::Verify {
            file,
            job,
            no_wallet,
        }) => {
            verify::run(file, job, no_wallet).await?;
        }
        Some(SubCommandType::Lookup { resume_hash }) => {
            verify::lookup(resume_hash).await?;
        }
        None => {
            tracing::error!("no subcommand passed");
        }
    }
    Ok(())
}
