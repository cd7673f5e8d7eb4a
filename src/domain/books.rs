//! Book input rules and partial updates.

use shelfmark_api_types::{Book, BookInput, Genre};

use super::error::DomainError;

/// Reject inputs the backend schema would refuse.
///
/// Title, author and ISBN must be non-blank; `copies` cannot go negative by
/// construction.
pub fn validate_book_input(input: &BookInput) -> Result<(), DomainError> {
    let required = [
        ("Title", &input.title),
        ("Author", &input.author),
        ("ISBN", &input.isbn),
    ];
    for (label, value) in required {
        if value.trim().is_empty() {
            return Err(DomainError::validation(format!("{label} is required")));
        }
    }
    Ok(())
}

/// Field-by-field changes to a book. `None` leaves the field untouched.
///
/// The backend only accepts full replacement, so a patch is applied to the
/// current record to produce a complete [`BookInput`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<Genre>,
    pub isbn: Option<String>,
    pub copies: Option<u32>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, book: &Book) -> BookInput {
        let mut input = book.to_input();
        if let Some(title) = &self.title {
            input.title = title.clone();
        }
        if let Some(author) = &self.author {
            input.author = author.clone();
        }
        if let Some(genre) = self.genre {
            input.genre = genre;
        }
        if let Some(isbn) = &self.isbn {
            input.isbn = isbn.clone();
        }
        if let Some(copies) = self.copies {
            input.copies = copies;
        }
        if let Some(description) = &self.description {
            input.description = description.clone();
        }
        input
    }
}
