//! Split a changelog file into entries.

use anyhow::Result;
use edge_changelog::{
    decode_text, format_date_safely, EntrySplitter, HeadingSplitter, Normalizer,
};

use super::ParseArgs;
use crate::context::Context;

/// Run the parse command.
pub fn run(args: ParseArgs, ctx: &Context) -> Result<()> {
    let raw = ctx.read_input(&args.file)?;

    let text = if args.raw {
        decode_text(&raw)
    } else {
        Normalizer::from_config(&ctx.config.encoding).normalize(&raw)
    };
    ctx.output
        .debug(&format!("{} bytes in, {} chars after normalization", raw.len(), text.chars().count()));

    let entries = HeadingSplitter::new().split(&text);

    if ctx.output.is_json() {
        ctx.output.json(&entries);
        return Ok(());
    }

    if entries.is_empty() {
        ctx.output
            .warn("No version headings found; the page would render the unstructured fallback");
        return Ok(());
    }

    ctx.output.header(&format!("{} entries", entries.len()));
    let widths = [10, 20, 40];
    ctx.output.table_row(&["VERSION", "DATE", "HEADING"], &widths);
    for entry in &entries {
        let date = format_date_safely(entry.date.as_deref());
        ctx.output
            .table_row(&[&entry.version, &date, entry.raw_heading.trim()], &widths);

        if ctx.output.is_verbose() {
            ctx.output.debug(&format!(
                "#{}: {} bytes of content",
                entry.anchor(),
                entry.content.len()
            ));
        }
    }

    Ok(())
}
