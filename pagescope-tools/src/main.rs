//! A set of tools for pagescope.

mod dump;
mod export;
mod strings;

use clap::{Parser, Subcommand};
pub(crate) use pagescope::Result;
use pagescope::Options;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Dump(dump::Args),
    Export(export::Args),
    Strings(strings::Args),
}

/// Options shared by the commands that open a file.
#[derive(clap::Args, Debug, Clone)]
pub(crate) struct OpenArgs {
    /// Sets the page size in bytes
    #[clap(long, default_value_t = 64 << 10)]
    page_size: u32,

    /// Sets the number of raw pages to cache
    #[clap(long, default_value_t = 128)]
    cache_pages: usize,

    /// Sets the number of worker threads
    #[clap(long, default_value_t = 4)]
    threads: usize,
}

impl OpenArgs {
    pub(crate) fn options(&self) -> Options {
        let mut options = Options::default();
        options.page_size = self.page_size;
        options.cache_capacity = self.cache_pages;
        options.worker_threads = self.threads;
        options
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    match args.cmd {
        Commands::Dump(args) => dump::run(args)?,
        Commands::Export(args) => export::run(args)?,
        Commands::Strings(args) => strings::run(args)?,
    }
    Ok(())
}
