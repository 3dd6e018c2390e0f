//! Command-line interface definition.
//!
//! - `subpack build` - run one build cycle
//! - `subpack watch` - build, then rebuild whenever a source file changes

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use subpack_config::ConfigOverrides;

/// Subpack - mini-program builds with sub-package commons chunks
#[derive(Parser, Debug)]
#[command(
    name = "subpack",
    version,
    about = "Mini-program builds with sub-package commons chunks",
    long_about = "Subpack compiles a mini-program, discovers custom components as entries,\n\
                  and places modules used only inside one sub-package into that\n\
                  sub-package's commons chunk."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the project once
    ///
    /// Runs compiler passes until no new components are discovered, then
    /// writes the reconciled output.
    Build(BuildArgs),

    /// Build, then rebuild on every source change
    ///
    /// Discovered components stay registered between rebuilds.
    Watch(BuildArgs),
}

/// Arguments shared by `build` and `watch`.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Output directory, relative to the project root
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Write analyze.json with the module usage of the final pass
    #[arg(long)]
    pub analyze: bool,

    /// Config file to use instead of subpack.toml
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl BuildArgs {
    /// Flags that override config file and environment values.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            out_dir: self.out_dir.clone(),
            analyze: self.analyze.then_some(true),
            ..ConfigOverrides::default()
        }
    }
}
