use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None, arg_required_else_help(true))]
pub struct Cli {
    /// maximum level of log messages to print
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// render a poster from a config file
    Render {
        /// render config (json)
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
        /// output file, or a folder to write `<title-slug>.<ext>` into.
        /// defaults to `social-post-<unix millis>.<ext>` in the working directory
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// background url, data uri or path, overriding the one in the config
        #[arg(short, long, value_name = "SRC")]
        background: Option<String>,
        /// also write the solved layout as json
        #[arg(long, value_name = "FILE")]
        fit_report: Option<PathBuf>,
    },
    /// write schema files
    Schema {
        /// folder to write schemas into (will be created if it doesn't already exist)
        #[arg(short, long, value_name = "FILE", default_value = "./schemas/")]
        out_dir: PathBuf
    },
}
