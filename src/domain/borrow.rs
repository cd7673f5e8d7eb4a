//! Borrow request rules.

use shelfmark_api_types::{Book, BorrowRequest};
use time::{Date, Duration};

use super::error::DomainError;

/// Loan period applied when the borrower does not pick a due date.
pub const DEFAULT_LOAN_DAYS: i64 = 14;

/// Advisory pre-check run before a borrow is sent.
///
/// Uses the last fetched `copies`, which may lag behind other borrowers; the
/// backend remains the authority.
pub fn validate_borrow_quantity(quantity: u32, book: &Book) -> Result<(), DomainError> {
    if quantity < 1 || quantity > book.copies {
        return Err(DomainError::validation(format!(
            "Please enter a quantity between 1 and {} (available copies).",
            book.copies
        )));
    }
    Ok(())
}

pub fn default_due_date(today: Date) -> Date {
    today.saturating_add(Duration::days(DEFAULT_LOAN_DAYS))
}

pub fn borrow_request(book: &Book, quantity: u32, due_date: Date) -> BorrowRequest {
    BorrowRequest {
        book: book.id.clone(),
        quantity,
        due_date,
    }
}

#[cfg(test)]
mod tests {
    use shelfmark_api_types::{BookId, Genre};
    use time::macros::date;

    use super::*;

    fn book(copies: u32) -> Book {
        Book {
            id: BookId::new("b1"),
            title: "Sapiens".to_string(),
            author: "Yuval Noah Harari".to_string(),
            genre: Genre::History,
            isbn: "9780062316097".to_string(),
            copies,
            available: copies > 0,
            description: None,
        }
    }

    #[test]
    fn quantity_bounds() {
        let book = book(3);
        assert!(validate_borrow_quantity(0, &book).is_err());
        assert!(validate_borrow_quantity(1, &book).is_ok());
        assert!(validate_borrow_quantity(3, &book).is_ok());
        assert!(validate_borrow_quantity(4, &book).is_err());
    }

    #[test]
    fn unavailable_book_rejects_everything() {
        let book = book(0);
        assert!(validate_borrow_quantity(1, &book).is_err());
    }

    #[test]
    fn due_date_defaults_to_two_weeks() {
        assert_eq!(default_due_date(date!(2026 - 10 - 19)), date!(2026 - 11 - 02));
    }

    #[test]
    fn request_targets_book_id() {
        let request = borrow_request(&book(2), 2, date!(2026 - 11 - 02));
        assert_eq!(request.book, BookId::new("b1"));
        assert_eq!(request.quantity, 2);
    }
}
