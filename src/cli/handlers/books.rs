use std::io;

use shelfmark::{application::error::AppError, config::BooksCmd, domain::books::BookPatch};
use shelfmark_api_types::{BookId, BookInput};

use crate::cli::Ctx;
use crate::cli::io::confirm;
use crate::cli::print::{book_detail, book_table, notice, print_json};

pub async fn handle(ctx: &Ctx, cmd: BooksCmd) -> Result<(), AppError> {
    match cmd {
        BooksCmd::List { json } => list(ctx, json).await,
        BooksCmd::Get { id } => get(ctx, BookId::from(id)).await,
        BooksCmd::Add {
            title,
            author,
            genre,
            isbn,
            copies,
            description,
        } => {
            let input = BookInput {
                title,
                author,
                genre: genre.into(),
                isbn,
                copies,
                description,
            };
            add(ctx, input).await
        }
        BooksCmd::Update {
            id,
            title,
            author,
            genre,
            isbn,
            copies,
            description,
            clear_description,
        } => {
            let description = if clear_description {
                Some(None)
            } else {
                description.map(Some)
            };
            let patch = BookPatch {
                title,
                author,
                genre: genre.map(Into::into),
                isbn,
                copies,
                description,
            };
            update(ctx, BookId::from(id), patch).await
        }
        BooksCmd::Delete { id, yes } => delete(ctx, BookId::from(id), yes).await,
    }
}

async fn list(ctx: &Ctx, json: bool) -> Result<(), AppError> {
    let books = ctx.catalog.list_books().await?;
    if json {
        return print_json(&books);
    }
    println!("{}", book_table(&books));
    Ok(())
}

async fn get(ctx: &Ctx, id: BookId) -> Result<(), AppError> {
    let book = ctx.catalog.get_book(&id).await?;
    println!("{}", book_detail(&book));
    Ok(())
}

async fn add(ctx: &Ctx, input: BookInput) -> Result<(), AppError> {
    let book = ctx.catalog.add_book(&input).await?;
    notice(&format!("Added \"{}\" ({})", book.title, book.id));
    print_json(&book)
}

async fn update(ctx: &Ctx, id: BookId, patch: BookPatch) -> Result<(), AppError> {
    if patch.is_empty() {
        return Err(AppError::validation(
            "Nothing to update; pass at least one field to change.",
        ));
    }
    let book = ctx.catalog.patch_book(&id, &patch).await?;
    notice(&format!("Updated \"{}\"", book.title));
    print_json(&book)
}

async fn delete(ctx: &Ctx, id: BookId, yes: bool) -> Result<(), AppError> {
    if !yes {
        let book = ctx.catalog.get_book(&id).await?;
        let prompt = format!("Delete \"{}\" by {}?", book.title, book.author);
        let confirmed = confirm(&prompt, &mut io::stdin().lock(), &mut io::stderr())?;
        if !confirmed {
            notice("Deletion cancelled.");
            return Ok(());
        }
    }

    ctx.catalog.delete_book(&id).await?;
    notice(&format!("Deleted book {id}"));
    Ok(())
}
