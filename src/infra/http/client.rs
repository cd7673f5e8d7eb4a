use std::time::Instant;

use async_trait::async_trait;
use metrics::histogram;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shelfmark_api_types::{
    ApiEnvelope, BackendBook, BackendBorrowSummary, Book, BookId, BookInput, BorrowRequest,
    BorrowSummaryEntry, ErrorEnvelope, normalize_book, normalize_borrow_summary,
};
use tracing::{debug, instrument};

use super::error::ApiError;
use crate::application::repos::CatalogBackend;
use crate::config::ApiSettings;
use crate::infra::error::InfraError;

pub(crate) const METRIC_API_REQUEST_MS: &str = "shelfmark_api_request_ms";

const BOOKS_PATH: [&str; 2] = ["api", "books"];
const BORROW_PATH: [&str; 2] = ["api", "borrow"];

/// HTTP client for the catalog backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, InfraError> {
        let mut builder = Client::builder().user_agent(Self::user_agent());
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|err| {
            InfraError::configuration(format!("failed to build HTTP client: {err}"))
        })?;

        Self::with_client(client, settings.base_url.clone())
    }

    pub fn with_client(client: Client, base: Url) -> Result<Self, InfraError> {
        if base.cannot_be_a_base() {
            return Err(InfraError::configuration(format!(
                "`{base}` cannot be used as an API base URL"
            )));
        }
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("shelfmark/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build an endpoint URL from path segments; each segment is
    /// percent-encoded so opaque ids cannot escape their position.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    #[instrument(skip_all, fields(method = %method, path = %url.path()))]
    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<(StatusCode, Vec<u8>), ApiError> {
        let started_at = Instant::now();
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?.to_vec();

        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
        histogram!(METRIC_API_REQUEST_MS, "method" => method.to_string()).record(elapsed_ms);
        debug!(status = status.as_u16(), elapsed_ms, "Catalog request completed");

        Ok((status, bytes))
    }

    /// Issue a request whose success body is an envelope around `T`.
    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let (status, bytes) = self.dispatch(method, url, body).await?;
        if !status.is_success() {
            return Err(rejection(status, &bytes));
        }

        let envelope: ApiEnvelope<T> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            // A refusal usually carries no `data` at all.
            Err(err) => {
                return Err(refusal(&bytes)
                    .unwrap_or_else(|| ApiError::decode(format!("invalid envelope: {err}"))));
            }
        };
        if !envelope.success {
            return Err(ApiError::Rejected {
                message: envelope.message,
            });
        }
        Ok(envelope.data)
    }

    /// Issue a request whose success body carries nothing the client needs.
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<(), ApiError> {
        let (status, bytes) = self.dispatch(method, url, body).await?;
        if !status.is_success() {
            return Err(rejection(status, &bytes));
        }

        // An empty or non-envelope body is fine; an explicit refusal is not.
        match refusal(&bytes) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn book_url(&self, id: &BookId) -> Url {
        self.endpoint(&[BOOKS_PATH[0], BOOKS_PATH[1], id.as_str()])
    }
}

fn to_body<T: Serialize>(value: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value)
        .map_err(|err| ApiError::decode(format!("failed to encode request: {err}")))
}

fn rejection(status: StatusCode, bytes: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<ErrorEnvelope>(bytes)
        .ok()
        .and_then(|envelope| envelope.message)
        .filter(|message| !message.trim().is_empty());
    ApiError::Status { status, message }
}

/// `Rejected` when a 2xx body is an envelope with `success: false`.
fn refusal(bytes: &[u8]) -> Option<ApiError> {
    let envelope = serde_json::from_slice::<ErrorEnvelope>(bytes).ok()?;
    (!envelope.success && looks_like_envelope(bytes)).then(|| ApiError::Rejected {
        message: envelope.message.unwrap_or_default(),
    })
}

fn looks_like_envelope(bytes: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .map(|value| value.get("success").is_some())
        .unwrap_or(false)
}

fn not_found_as(id: &BookId, error: ApiError) -> ApiError {
    if error.is_not_found() {
        ApiError::NotFound { id: id.clone() }
    } else {
        error
    }
}

#[async_trait]
impl CatalogBackend for ApiClient {
    async fn list_books(&self) -> Result<Vec<Book>, ApiError> {
        let url = self.endpoint(&BOOKS_PATH);
        let books: Vec<BackendBook> = self.fetch(Method::GET, url, None).await?;
        Ok(books.into_iter().map(normalize_book).collect())
    }

    async fn get_book(&self, id: &BookId) -> Result<Book, ApiError> {
        let book: BackendBook = self
            .fetch(Method::GET, self.book_url(id), None)
            .await
            .map_err(|err| not_found_as(id, err))?;
        Ok(normalize_book(book))
    }

    async fn create_book(&self, input: &BookInput) -> Result<Book, ApiError> {
        let url = self.endpoint(&BOOKS_PATH);
        let book: BackendBook = self.fetch(Method::POST, url, Some(to_body(input)?)).await?;
        Ok(normalize_book(book))
    }

    async fn update_book(&self, id: &BookId, input: &BookInput) -> Result<Book, ApiError> {
        let book: BackendBook = self
            .fetch(Method::PUT, self.book_url(id), Some(to_body(input)?))
            .await
            .map_err(|err| not_found_as(id, err))?;
        Ok(normalize_book(book))
    }

    async fn delete_book(&self, id: &BookId) -> Result<(), ApiError> {
        self.execute(Method::DELETE, self.book_url(id), None)
            .await
            .map_err(|err| not_found_as(id, err))
    }

    async fn borrow_book(&self, request: &BorrowRequest) -> Result<(), ApiError> {
        let url = self.endpoint(&BORROW_PATH);
        self.execute(Method::POST, url, Some(to_body(request)?)).await
    }

    async fn borrow_summary(&self) -> Result<Vec<BorrowSummaryEntry>, ApiError> {
        let url = self.endpoint(&BORROW_PATH);
        let rows: Vec<BackendBorrowSummary> = self.fetch(Method::GET, url, None).await?;
        Ok(rows.into_iter().map(normalize_borrow_summary).collect())
    }
}
