use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use super::commands::{
    export::ExportArgs, load::LoadArgs, schema::SchemaArgs, search::SearchArgs,
    visualize::VisualizeArgs,
};
use crate::metrics::{DateBasis, DerivationOptions};

#[derive(Debug, Parser)]
#[command(
    name = "ctrscope",
    version,
    about = "Contact trace record consolidation and delay analysis"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub store_root: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Load(LoadArgs),
    Visualize(VisualizeArgs),
    Search(SearchArgs),
    Export(ExportArgs),
    Schema(SchemaArgs),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DateBasisArg {
    #[default]
    Disconnect,
    Initiation,
}

impl From<DateBasisArg> for DateBasis {
    fn from(value: DateBasisArg) -> Self {
        match value {
            DateBasisArg::Disconnect => Self::Disconnect,
            DateBasisArg::Initiation => Self::Initiation,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct AnalysisArgs {
    #[arg(long, value_name = "SECONDS")]
    pub threshold: Option<f64>,

    #[arg(long, value_name = "CHANNEL")]
    pub channel: Option<String>,

    #[arg(long, value_enum, default_value_t = DateBasisArg::Disconnect)]
    pub date_basis: DateBasisArg,
}

impl AnalysisArgs {
    #[must_use]
    pub fn derivation_options(&self) -> DerivationOptions {
        DerivationOptions {
            channel: self
                .channel
                .as_deref()
                .map(str::trim)
                .filter(|channel| !channel.is_empty())
                .map(str::to_string),
            date_basis: self.date_basis.into(),
        }
    }
}
