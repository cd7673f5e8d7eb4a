use shelfmark::{application::error::AppError, config::SummaryArgs};

use crate::cli::Ctx;
use crate::cli::print::{print_json, summary_table};

pub async fn handle(ctx: &Ctx, args: SummaryArgs) -> Result<(), AppError> {
    // The summary is always refreshed when viewed.
    let entries = ctx.catalog.refresh_borrow_summary().await?;

    if args.json {
        return print_json(&entries);
    }
    println!("{}", summary_table(&entries));
    Ok(())
}
