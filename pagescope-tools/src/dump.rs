//! Prints pages of a file as a hex dump followed by a text preview.

use std::{
    io::{self, Write},
    path::PathBuf,
};

use clap::Parser;
use futures::executor::block_on;
use log::info;
use pagescope::{
    decode::{Decoder, PreviewOptions},
    Error, PageCollection,
};

use crate::{OpenArgs, Result};

#[derive(Parser, Debug, Clone)]
#[clap(about = "Print pages of a file")]
pub(crate) struct Args {
    /// Sets the path of the file to view
    path: PathBuf,

    #[clap(flatten)]
    open: OpenArgs,

    /// Sets the first page to print
    #[clap(long, default_value_t = 0)]
    start: u64,

    /// Sets the number of pages to print
    #[clap(long, default_value_t = 1)]
    count: u64,
}

pub(crate) fn run(args: Args) -> Result<()> {
    let source = pagescope::open(&args.path, args.open.options())?;
    info!(
        "Open {} with {} bytes in {} pages",
        args.path.display(),
        source.file_len(),
        source.page_count()
    );
    let pages = PageCollection::with_decoder(source, Decoder::new(PreviewOptions::console()));
    if args.start >= pages.count() && !pages.is_empty() {
        return Err(Error::IndexOutOfRange {
            index: args.start,
            count: pages.count(),
        });
    }

    // Start every load before waiting on the first one.
    let end = args.start.saturating_add(args.count).min(pages.count());
    let views = (args.start..end)
        .map(|index| pages.get(index))
        .collect::<Result<Vec<_>>>()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for view in views {
        block_on(view.settled());
        writeln!(out, "=== {} ===", view.display_header())?;
        if let Some(hex) = view.hex_dump() {
            out.write_all(hex.as_bytes())?;
        }
        writeln!(out, "{}", view.text_preview().unwrap_or_default())?;
    }
    out.flush()?;
    pages.source().close();
    Ok(())
}
