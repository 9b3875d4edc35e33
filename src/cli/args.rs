//! Command-line argument parsing for BrdBuddy
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::context::ContextType;
use crate::errors::Result;

/// BrdBuddy - Ask questions about onboarding documents and prefill BRD sections
#[derive(Parser, Debug)]
#[command(name = "brdbuddy")]
#[command(version)]
#[command(about = "RAG assistant for business requirements documents", long_about = None)]
pub struct Args {
    /// Configuration file path (default: ~/.brdbuddy/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the generation model from the configuration
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Verbose logging (debug level for brdbuddy)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question about a document
    Ask {
        /// The question
        #[arg(value_name = "QUESTION")]
        question: String,

        /// CHAT, SUMMARY, TEMPLATE or DECISION
        #[arg(long, default_value = "CHAT")]
        context_type: String,

        /// Document the question is about
        #[arg(long)]
        document: String,

        /// Print the answer as it is generated
        #[arg(long)]
        stream: bool,
    },

    /// Summarize a stored BRD record
    SummarizeBrd {
        /// BRD id
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Prefill the sections in a JSON file from document evidence
    Prefill {
        /// JSON file holding the section tree
        #[arg(value_name = "SECTIONS_FILE")]
        sections_file: PathBuf,

        /// Source document ids (only the first one is searched)
        #[arg(long = "document", required = true)]
        documents: Vec<String>,

        /// Extra context appended to every field's evidence
        #[arg(long)]
        additional_context: Option<String>,
    },

    /// Embed a document's stored artifacts into the vector index
    Index {
        /// Document whose artifacts are indexed
        #[arg(long)]
        document: String,
    },

    /// Display current configuration
    Config,
}

impl Commands {
    /// Parsed context type of an `ask` command
    pub fn context_type(&self) -> Option<Result<ContextType>> {
        match self {
            Commands::Ask { context_type, .. } => Some(context_type.parse()),
            _ => None,
        }
    }
}
