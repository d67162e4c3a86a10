//! Prints the runs of printable ASCII in a file.

use std::{
    io::{self, Write},
    path::PathBuf,
};

use clap::Parser;
use futures::executor::block_on;
use pagescope::StringsOptions;

use crate::{OpenArgs, Result};

#[derive(Parser, Debug, Clone)]
#[clap(about = "Print printable strings of a file")]
pub(crate) struct Args {
    /// Sets the path of the file to scan
    path: PathBuf,

    #[clap(flatten)]
    open: OpenArgs,

    /// Sets the minimum length of a string
    #[clap(long, default_value_t = 4)]
    min_len: usize,

    /// Prefixes each string with its hex offset
    #[clap(long)]
    offsets: bool,
}

pub(crate) fn run(args: Args) -> Result<()> {
    let source = pagescope::open(&args.path, args.open.options())?;
    let mut options = StringsOptions::default();
    options.min_len = args.min_len;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    block_on(pagescope::for_each_string(&source, &options, |s| {
        if args.offsets {
            writeln!(out, "{:08X}: {}", s.offset, s.text)?;
        } else {
            writeln!(out, "{}", s.text)?;
        }
        Ok(())
    }))?;
    out.flush()?;
    source.close();
    Ok(())
}
