use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque book identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BookId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Genre {
    Fiction,
    NonFiction,
    Science,
    History,
    Biography,
    Fantasy,
}

impl Genre {
    pub const ALL: [Genre; 6] = [
        Genre::Fiction,
        Genre::NonFiction,
        Genre::Science,
        Genre::History,
        Genre::Biography,
        Genre::Fantasy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Genre::Fiction => "FICTION",
            Genre::NonFiction => "NON_FICTION",
            Genre::Science => "SCIENCE",
            Genre::History => "HISTORY",
            Genre::Biography => "BIOGRAPHY",
            Genre::Fantasy => "FANTASY",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Genre::ALL
            .into_iter()
            .find(|genre| genre.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("unknown genre `{value}`"))
    }
}

/// Book record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendBook {
    #[serde(rename = "_id")]
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    pub copies: u32,
    /// Availability as reported by the backend; clients derive their own.
    #[serde(default)]
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Book record as seen by clients of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    pub copies: u32,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Book {
    /// Returns the request body that would recreate this record.
    pub fn to_input(&self) -> BookInput {
        BookInput {
            title: self.title.clone(),
            author: self.author.clone(),
            genre: self.genre,
            isbn: self.isbn.clone(),
            copies: self.copies,
            description: self.description.clone(),
        }
    }
}

/// Body for `POST /api/books` and `PUT /api/books/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    pub copies: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Maps a backend record onto the client shape.
///
/// `available` is recomputed from `copies` so the two can never disagree.
pub fn normalize_book(backend: BackendBook) -> Book {
    let BackendBook {
        id,
        title,
        author,
        genre,
        isbn,
        copies,
        available: _,
        description,
    } = backend;

    Book {
        id,
        title,
        author,
        genre,
        isbn,
        copies,
        available: copies > 0,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(copies: u32, available: bool) -> BackendBook {
        BackendBook {
            id: BookId::new("64f0c2"),
            title: "The Dispossessed".to_string(),
            author: "Ursula K. Le Guin".to_string(),
            genre: Genre::Fiction,
            isbn: "9780060512750".to_string(),
            copies,
            available,
            description: Some("An ambiguous utopia".to_string()),
        }
    }

    #[test]
    fn normalize_moves_backend_id_and_keeps_fields() {
        let raw = backend(4, true);
        let book = normalize_book(raw.clone());

        assert_eq!(book.id, raw.id);
        assert_eq!(book.title, raw.title);
        assert_eq!(book.author, raw.author);
        assert_eq!(book.genre, raw.genre);
        assert_eq!(book.isbn, raw.isbn);
        assert_eq!(book.copies, raw.copies);
        assert_eq!(book.description, raw.description);
    }

    #[test]
    fn availability_overrides_backend_flag() {
        // The backend's `available` is discarded; only `copies` decides.
        assert!(normalize_book(backend(1, false)).available);
        assert!(!normalize_book(backend(0, true)).available);
    }

    #[test]
    fn backend_book_parses_wire_shape() {
        let json = r#"{
            "_id": "abc123",
            "title": "Cosmos",
            "author": "Carl Sagan",
            "genre": "SCIENCE",
            "isbn": "9780345539434",
            "copies": 2,
            "available": true,
            "createdAt": "2025-06-01T10:00:00.000Z"
        }"#;

        let parsed: BackendBook = serde_json::from_str(json).expect("backend book");
        assert_eq!(parsed.id.as_str(), "abc123");
        assert_eq!(parsed.genre, Genre::Science);
        assert!(parsed.description.is_none());
    }

    #[test]
    fn client_book_serializes_with_plain_id() {
        let book = normalize_book(backend(3, true));
        let value = serde_json::to_value(&book).expect("serialize");
        assert_eq!(value["id"], "64f0c2");
        assert!(value.get("_id").is_none());
    }

    #[test]
    fn genre_wire_names_match_backend() {
        let value = serde_json::to_value(Genre::NonFiction).expect("serialize");
        assert_eq!(value, "NON_FICTION");
        assert_eq!("non_fiction".parse::<Genre>(), Ok(Genre::NonFiction));
        assert!("POETRY".parse::<Genre>().is_err());
    }

    #[test]
    fn input_omits_missing_description() {
        let input = BookInput {
            title: "X".into(),
            author: "Y".into(),
            genre: Genre::Fiction,
            isbn: "123".into(),
            copies: 0,
            description: None,
        };
        let value = serde_json::to_value(&input).expect("serialize");
        assert!(value.get("description").is_none());
        assert_eq!(value["copies"], 0);
    }
}
