use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use movie_sort::reorganize::{AutoConfirm, Confirm, ConfigOverrides, MovieSort, StdinPrompt};

#[derive(Parser)]
#[command(author, version, name = env!("CARGO_BIN_NAME"), about = "Rename, stage and sort movies into a categorized library")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file to use instead of the default user config
    #[arg(long, value_hint = clap::ValueHint::FilePath, global = true)]
    config: Option<PathBuf>,

    /// Library root directory
    #[arg(short = 'b', long, value_hint = clap::ValueHint::DirPath, global = true)]
    base: Option<PathBuf>,

    /// Directory searched for mis-named files
    #[arg(short = 's', long, value_hint = clap::ValueHint::DirPath, global = true)]
    source: Option<PathBuf>,

    /// Directory holding staged title folders
    #[arg(short = 't', long, value_hint = clap::ValueHint::DirPath, global = true)]
    staging: Option<PathBuf>,

    /// Auto-confirm all prompts without asking
    #[arg(short = 'a', long, global = true)]
    auto: bool,

    /// Print debug information
    #[arg(short = 'D', long, global = true)]
    debug: bool,

    /// Print validation report as JSON
    #[arg(short = 'j', long, global = true)]
    json: bool,

    /// Do not write a run log file
    #[arg(long, global = true)]
    no_log: bool,

    /// Only print changes without moving files
    #[arg(short = 'p', long, global = true)]
    print: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Clone, Copy, Default)]
enum Command {
    /// Run all phases: stage, sort and validate
    #[default]
    Run,

    /// Rename mis-named files and stage them into title folders
    Stage,

    /// Move staged title folders into their library categories
    Sort,

    /// Check the library against the catalog without changing anything
    Validate,
}

impl From<&Args> for ConfigOverrides {
    fn from(args: &Args) -> Self {
        Self {
            config_file: args.config.clone(),
            base_dir: args.base.clone(),
            source_dir: args.source.clone(),
            staging_dir: args.staging.clone(),
            auto: args.auto,
            debug: args.debug,
            dryrun: args.print,
            json: args.json,
            no_log: args.no_log,
            verbose: args.verbose,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        return movie_sort::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"));
    }

    let mut movie_sort = MovieSort::from_args(ConfigOverrides::from(&args))?;
    if movie_sort.config().debug {
        println!("{}", movie_sort.config());
    }
    movie_sort.print_config_warnings();

    let mut confirm: Box<dyn Confirm> = if movie_sort.config().auto {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(StdinPrompt::new())
    };

    match args.command.unwrap_or_default() {
        Command::Run => {
            movie_sort.run_all(confirm.as_mut())?;
        }
        Command::Stage => {
            movie_sort.run_stage(confirm.as_mut())?;
        }
        Command::Sort => {
            movie_sort.run_sort(confirm.as_mut())?;
        }
        Command::Validate => {
            movie_sort.run_validate()?;
        }
    }
    Ok(())
}
