use serde::{Deserialize, Serialize};
use time::Date;

use crate::books::BookId;

time::serde::format_description!(calendar_date, Date, "[year]-[month]-[day]");

/// Body for `POST /api/borrow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub book: BookId,
    pub quantity: u32,
    #[serde(with = "calendar_date")]
    pub due_date: Date,
}

/// Book reference nested inside a backend borrow summary row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowedBookRef {
    pub title: String,
    pub isbn: String,
}

/// Aggregated borrow row as returned by `GET /api/borrow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendBorrowSummary {
    pub book: BorrowedBookRef,
    pub total_quantity: u32,
}

/// Flattened borrow summary row used by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowSummaryEntry {
    pub book_title: String,
    pub isbn: String,
    pub total_quantity_borrowed: u32,
}

pub fn normalize_borrow_summary(backend: BackendBorrowSummary) -> BorrowSummaryEntry {
    BorrowSummaryEntry {
        book_title: backend.book.title,
        isbn: backend.book.isbn,
        total_quantity_borrowed: backend.total_quantity,
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn borrow_request_uses_backend_field_names() {
        let request = BorrowRequest {
            book: BookId::new("b1"),
            quantity: 2,
            due_date: date!(2026 - 11 - 02),
        };

        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["book"], "b1");
        assert_eq!(value["quantity"], 2);
        assert_eq!(value["dueDate"], "2026-11-02");
    }

    #[test]
    fn borrow_request_rejects_malformed_date() {
        let json = r#"{"book":"b1","quantity":1,"dueDate":"02/11/2026"}"#;
        assert!(serde_json::from_str::<BorrowRequest>(json).is_err());
    }

    #[test]
    fn summary_flattens_nested_book() {
        let json = r#"{"book":{"title":"Dune","isbn":"9780441013593"},"totalQuantity":5}"#;
        let backend: BackendBorrowSummary = serde_json::from_str(json).expect("summary row");
        let entry = normalize_borrow_summary(backend);

        assert_eq!(entry.book_title, "Dune");
        assert_eq!(entry.isbn, "9780441013593");
        assert_eq!(entry.total_quantity_borrowed, 5);

        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(value["bookTitle"], "Dune");
        assert_eq!(value["totalQuantityBorrowed"], 5);
    }
}
