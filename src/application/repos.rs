//! Backend trait describing the remote catalog.

use async_trait::async_trait;
use shelfmark_api_types::{Book, BookId, BookInput, BorrowRequest, BorrowSummaryEntry};

use crate::infra::http::ApiError;

/// Remote catalog operations, already normalized to client records.
///
/// Implemented by [`crate::infra::http::ApiClient`]; tests substitute an
/// in-memory catalog.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn list_books(&self) -> Result<Vec<Book>, ApiError>;

    async fn get_book(&self, id: &BookId) -> Result<Book, ApiError>;

    async fn create_book(&self, input: &BookInput) -> Result<Book, ApiError>;

    async fn update_book(&self, id: &BookId, input: &BookInput) -> Result<Book, ApiError>;

    async fn delete_book(&self, id: &BookId) -> Result<(), ApiError>;

    async fn borrow_book(&self, request: &BorrowRequest) -> Result<(), ApiError>;

    async fn borrow_summary(&self) -> Result<Vec<BorrowSummaryEntry>, ApiError>;
}
