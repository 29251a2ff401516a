use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::web::DEFAULT_ADDR;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Find places matching a vibe query
    Search {
        /// e.g. "quiet place to work"
        query: String,

        /// Surrounding note text used for location and keyword context
        #[clap(short, long, conflicts_with = "notes_file")]
        notes: Option<String>,

        /// Read note text from a file
        #[clap(long)]
        notes_file: Option<PathBuf>,

        /// Print every ranked result, not only the best match
        #[clap(short, long, default_value = "false")]
        all: bool,
    },
    /// List vocabulary keywords found in text
    Keywords { text: String },
    /// Print the contextual query built from a query and notes
    Enhance {
        query: String,

        #[clap(short, long)]
        notes: Option<String>,
    },
    /// Serve the HTTP API
    Serve {
        #[clap(long, default_value = DEFAULT_ADDR)]
        addr: String,
    },
}
