use shelfmark::{
    application::error::AppError, config::BorrowArgs, domain::borrow::default_due_date,
};
use shelfmark_api_types::BookId;

use crate::cli::Ctx;
use crate::cli::io::today;
use crate::cli::print::{notice, summary_table};

/// Borrow copies, then show the refreshed borrow summary.
pub async fn handle(ctx: &Ctx, args: BorrowArgs) -> Result<(), AppError> {
    let id = BookId::from(args.book_id);
    let due_date = args.due_date.unwrap_or_else(|| default_due_date(today()));

    ctx.catalog
        .borrow_book_checked(&id, args.quantity, due_date)
        .await?;
    notice(&format!(
        "Borrowed {} of book {id}, due {due_date}",
        args.quantity
    ));

    let summary = ctx.catalog.borrow_summary().await?;
    println!("{}", summary_table(&summary));
    Ok(())
}
