//! Cache key and tag definitions.
//!
//! `QueryKey` names a cached read, `Tag` names an entity or collection the
//! read depends on. Mutations invalidate tags; the registry maps tags back to
//! the keys that must be refetched.

use std::collections::HashSet;
use std::fmt;

use shelfmark_api_types::{Book, BookId, BorrowSummaryEntry};

/// Identifies an entity or derived collection for cache invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// A single book (`book:<id>`).
    Book(BookId),
    /// The full catalog listing (`book:LIST`).
    BookList,
    /// The aggregated borrow summary (`borrow:SUMMARY`).
    BorrowSummary,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Book(id) => write!(f, "book:{id}"),
            Tag::BookList => f.write_str("book:LIST"),
            Tag::BorrowSummary => f.write_str("borrow:SUMMARY"),
        }
    }
}

/// One cacheable read: an operation plus its argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Books,
    Book(BookId),
    BorrowSummary,
}

impl QueryKey {
    /// The tag every mutation affecting this read is guaranteed to invalidate.
    pub fn primary_tag(&self) -> Tag {
        match self {
            QueryKey::Books => Tag::BookList,
            QueryKey::Book(id) => Tag::Book(id.clone()),
            QueryKey::BorrowSummary => Tag::BorrowSummary,
        }
    }

    /// Tags a successful result of this read is stored under.
    ///
    /// A book listing depends on every book it contains plus the collection
    /// itself, so editing any listed book refreshes the listing.
    pub fn provided_tags(&self, value: &CachedValue) -> HashSet<Tag> {
        let mut tags = HashSet::new();
        tags.insert(self.primary_tag());
        if let (QueryKey::Books, CachedValue::Books(books)) = (self, value) {
            tags.extend(books.iter().map(|book| Tag::Book(book.id.clone())));
        }
        tags
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Books => f.write_str("getBooks"),
            QueryKey::Book(id) => write!(f, "getBook({id})"),
            QueryKey::BorrowSummary => f.write_str("getBorrowSummary"),
        }
    }
}

/// Result of a cached read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    Books(Vec<Book>),
    Book(Book),
    BorrowSummary(Vec<BorrowSummaryEntry>),
}

impl CachedValue {
    pub fn kind(&self) -> &'static str {
        match self {
            CachedValue::Books(_) => "books",
            CachedValue::Book(_) => "book",
            CachedValue::BorrowSummary(_) => "borrow_summary",
        }
    }

    pub fn into_books(self) -> Option<Vec<Book>> {
        match self {
            CachedValue::Books(books) => Some(books),
            _ => None,
        }
    }

    pub fn into_book(self) -> Option<Book> {
        match self {
            CachedValue::Book(book) => Some(book),
            _ => None,
        }
    }

    pub fn into_borrow_summary(self) -> Option<Vec<BorrowSummaryEntry>> {
        match self {
            CachedValue::BorrowSummary(entries) => Some(entries),
            _ => None,
        }
    }
}
