//! Shared request and response types for the shelfmark catalog API.
//!
//! Two shapes exist for most records: the *backend* shape as it travels over
//! the wire (`_id`, nested borrow summaries) and the *client* shape used by
//! the cache and the view layer. The `normalize_*` functions convert between
//! them and are the only place the two vocabularies meet.

mod books;
mod borrow;
mod envelope;

pub use books::{BackendBook, Book, BookId, BookInput, Genre, normalize_book};
pub use borrow::{
    BackendBorrowSummary, BorrowRequest, BorrowSummaryEntry, BorrowedBookRef,
    normalize_borrow_summary,
};
pub use envelope::{ApiEnvelope, ErrorEnvelope};
