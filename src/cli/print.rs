use serde::Serialize;
use shelfmark::application::error::AppError;
use shelfmark_api_types::{Book, BorrowSummaryEntry};

pub fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::unexpected(format!("failed to render output: {e}")))?;
    println!("{out}");
    Ok(())
}

/// Success notices go to stderr so stdout stays pipeable.
pub fn notice(message: &str) {
    eprintln!("{message}");
}

pub fn book_table(books: &[Book]) -> String {
    if books.is_empty() {
        return "No books in the catalog.".to_string();
    }

    let rows: Vec<[String; 6]> = books
        .iter()
        .map(|book| {
            [
                book.id.to_string(),
                book.title.clone(),
                book.author.clone(),
                book.genre.to_string(),
                book.copies.to_string(),
                if book.available { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    render_table(
        ["ID", "TITLE", "AUTHOR", "GENRE", "COPIES", "AVAILABLE"],
        &rows,
    )
}

pub fn book_detail(book: &Book) -> String {
    let mut out = format!(
        "{}\n  by {}\n  id: {}\n  genre: {}\n  isbn: {}\n  copies: {} ({})",
        book.title,
        book.author,
        book.id,
        book.genre,
        book.isbn,
        book.copies,
        if book.available {
            "available"
        } else {
            "unavailable"
        },
    );
    if let Some(description) = book.description.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push_str("\n\n");
        out.push_str(description);
    }
    out
}

pub fn summary_table(entries: &[BorrowSummaryEntry]) -> String {
    if entries.is_empty() {
        return "No books have been borrowed yet.".to_string();
    }

    let rows: Vec<[String; 3]> = entries
        .iter()
        .map(|entry| {
            [
                entry.book_title.clone(),
                entry.isbn.clone(),
                entry.total_quantity_borrowed.to_string(),
            ]
        })
        .collect();
    render_table(["TITLE", "ISBN", "TOTAL BORROWED"], &rows)
}

fn render_table<const N: usize>(headers: [&str; N], rows: &[[String; N]]) -> String {
    let mut widths = headers.map(|header| header.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![line(headers.to_vec())];
    lines.extend(
        rows.iter()
            .map(|row| line(row.iter().map(String::as_str).collect())),
    );
    lines.join("\n")
}
