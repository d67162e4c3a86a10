//! Writes the text preview of every page to a plain-text file.

use std::path::PathBuf;

use clap::Parser;
use futures::executor::block_on;
use log::info;
use pagescope::PageCollection;

use crate::{OpenArgs, Result};

#[derive(Parser, Debug, Clone)]
#[clap(about = "Export the text of all pages")]
pub(crate) struct Args {
    /// Sets the path of the file to export
    path: PathBuf,

    /// Sets the path of the text file to write
    #[clap(long, short, required = true)]
    output: PathBuf,

    #[clap(flatten)]
    open: OpenArgs,
}

pub(crate) fn run(args: Args) -> Result<()> {
    let source = pagescope::open(&args.path, args.open.options())?;
    let pages = PageCollection::new(source);
    block_on(pagescope::export_to_path(&pages, &args.output))?;
    info!(
        "Export {} pages of {} to {}",
        pages.count(),
        args.path.display(),
        args.output.display()
    );
    pages.source().close();
    Ok(())
}
