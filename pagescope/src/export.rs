use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use log::debug;

use crate::{collection::PageCollection, env::Env, Result};

/// Writes the text of every page as plain text, in page order.
///
/// Each page becomes a block of `=== <header> ===\n<text>\n\n`, where the
/// header is [`display_header`](crate::PageView::display_header) and the text
/// is the text preview. Pages are awaited one by one; a failed page exports
/// its error text.
pub async fn export<E, W>(pages: &PageCollection<E>, mut writer: W) -> Result<()>
where
    E: Env,
    W: Write,
{
    for page in pages {
        page.settled().await;
        write!(
            writer,
            "=== {} ===\n{}\n\n",
            page.display_header(),
            page.text_preview().unwrap_or_default()
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Exports the pages to a file, replacing it if it exists.
pub async fn export_to_path<E, P>(pages: &PageCollection<E>, path: P) -> Result<()>
where
    E: Env,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::create(path)?;
    export(pages, BufWriter::new(file)).await?;
    debug!("Export {} pages to {}", pages.count(), path.display());
    Ok(())
}
