use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "class-deps")]
#[command(about = "Inspect compiled Java classes and jars: references, missing dependencies and duplicates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long = "system-classpath", value_name = "PATH")]
    pub system_classpath: Vec<PathBuf>,

    #[arg(long)]
    pub no_system: bool,

    #[arg(long)]
    pub no_recurse: bool,

    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Info {
        path: PathBuf,

        #[arg(long, value_name = "NAME")]
        entry: Option<String>,
    },
    Refs {
        path: PathBuf,

        #[arg(long, value_name = "NAME")]
        entry: Option<String>,
    },
    Missing {
        path: PathBuf,

        #[arg(long, value_name = "NAME")]
        entry: Option<String>,
    },
    Verify { path: PathBuf },
    References { path: PathBuf },
    Entries { path: PathBuf },
    Duplicates { path: PathBuf },
    Archives { path: PathBuf },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
