//! Query/mutation dispatcher for the catalog.
//!
//! Reads go through the [`QueryStore`]: a fresh entry is returned without
//! touching the network, anything else triggers one fetch per key no matter
//! how many callers are waiting. Writes always go to the backend and, once
//! it accepts them, invalidate every tag the write could have affected
//! before returning.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use metrics::counter;
use shelfmark_api_types::{Book, BookId, BookInput, BorrowRequest, BorrowSummaryEntry};
use time::Date;
use tracing::{debug, info, instrument};

use crate::application::repos::CatalogBackend;
use crate::cache::{CachedValue, FetchTicket, QueryKey, QueryStore, Subscription, Tag, mutex_lock};
use crate::domain::books::{BookPatch, validate_book_input};
use crate::domain::borrow::{borrow_request, validate_borrow_quantity};
use crate::infra::http::ApiError;

const SOURCE: &str = "application::catalog";

pub(crate) const METRIC_CACHE_DEDUP: &str = "shelfmark_cache_dedup_total";

type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue, ApiError>>>;

struct InFlight {
    ticket: FetchTicket,
    future: SharedFetch,
}

type InFlightMap = Arc<Mutex<HashMap<QueryKey, InFlight>>>;

#[derive(Clone)]
pub struct CatalogService {
    backend: Arc<dyn CatalogBackend>,
    store: Arc<QueryStore>,
    in_flight: InFlightMap,
}

impl CatalogService {
    pub fn new(backend: Arc<dyn CatalogBackend>, store: Arc<QueryStore>) -> Self {
        Self {
            backend,
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &Arc<QueryStore> {
        &self.store
    }

    pub fn subscribe(&self, key: QueryKey) -> Subscription {
        self.store.subscribe(key)
    }

    pub async fn list_books(&self) -> Result<Vec<Book>, ApiError> {
        let value = self.query(QueryKey::Books).await?;
        expect_shape(value.into_books(), "books")
    }

    pub async fn get_book(&self, id: &BookId) -> Result<Book, ApiError> {
        let value = self.query(QueryKey::Book(id.clone())).await?;
        expect_shape(value.into_book(), "book")
    }

    pub async fn borrow_summary(&self) -> Result<Vec<BorrowSummaryEntry>, ApiError> {
        let value = self.query(QueryKey::BorrowSummary).await?;
        expect_shape(value.into_borrow_summary(), "borrow summary")
    }

    /// Borrow summary straight from the backend; the cache is updated too.
    pub async fn refresh_borrow_summary(&self) -> Result<Vec<BorrowSummaryEntry>, ApiError> {
        let value = self.refetch(QueryKey::BorrowSummary).await?;
        expect_shape(value.into_borrow_summary(), "borrow summary")
    }

    /// Read `key` from the network even if the cached value is fresh.
    pub async fn refetch(&self, key: QueryKey) -> Result<CachedValue, ApiError> {
        self.fetch_shared(key).await
    }

    #[instrument(skip_all, fields(title = %input.title))]
    pub async fn add_book(&self, input: &BookInput) -> Result<Book, ApiError> {
        validate_book_input(input)?;
        let book = self.backend.create_book(input).await?;
        self.store.invalidate_tags(&[Tag::BookList]);
        info!(id = %book.id, "Book added");
        Ok(book)
    }

    #[instrument(skip_all, fields(id = %id))]
    pub async fn update_book(&self, id: &BookId, input: &BookInput) -> Result<Book, ApiError> {
        validate_book_input(input)?;
        let book = self.backend.update_book(id, input).await?;
        self.store
            .invalidate_tags(&[Tag::Book(id.clone()), Tag::BookList]);
        info!("Book updated");
        Ok(book)
    }

    /// Apply `patch` on top of the current record and store the result.
    pub async fn patch_book(&self, id: &BookId, patch: &BookPatch) -> Result<Book, ApiError> {
        let current = self.get_book(id).await?;
        let input = patch.apply_to(&current);
        self.update_book(id, &input).await
    }

    #[instrument(skip_all, fields(id = %id))]
    pub async fn delete_book(&self, id: &BookId) -> Result<(), ApiError> {
        self.backend.delete_book(id).await?;
        self.store
            .invalidate_tags(&[Tag::Book(id.clone()), Tag::BookList]);
        info!("Book deleted");
        Ok(())
    }

    #[instrument(skip_all, fields(book = %request.book, quantity = request.quantity))]
    pub async fn borrow_book(&self, request: &BorrowRequest) -> Result<(), ApiError> {
        self.backend.borrow_book(request).await?;
        self.store.invalidate_tags(&[
            Tag::BookList,
            Tag::Book(request.book.clone()),
            Tag::BorrowSummary,
        ]);
        info!(due_date = %request.due_date, "Book borrowed");
        Ok(())
    }

    /// Borrow after checking `quantity` against the last known copy count.
    ///
    /// A rejected quantity never reaches the backend.
    pub async fn borrow_book_checked(
        &self,
        id: &BookId,
        quantity: u32,
        due_date: Date,
    ) -> Result<(), ApiError> {
        let book = self.get_book(id).await?;
        validate_borrow_quantity(quantity, &book)?;
        self.borrow_book(&borrow_request(&book, quantity, due_date))
            .await
    }

    async fn query(&self, key: QueryKey) -> Result<CachedValue, ApiError> {
        self.store.prune_unused();
        if let Some(value) = self.store.read(&key) {
            return Ok(value);
        }
        self.fetch_shared(key).await
    }

    /// Join the in-flight fetch for `key`, or start one.
    ///
    /// A fetch that began before its key was invalidated is not joined; its
    /// result may predate the mutation.
    fn fetch_shared(&self, key: QueryKey) -> SharedFetch {
        let mut in_flight = mutex_lock(&self.in_flight, SOURCE, "fetch_shared");
        if let Some(existing) = in_flight.get(&key)
            && !self.store.is_superseded(&key, existing.ticket)
        {
            counter!(METRIC_CACHE_DEDUP).increment(1);
            debug!(%key, "Joined in-flight fetch");
            return existing.future.clone();
        }

        let ticket = self.store.begin_fetch();
        let future = run_fetch(
            Arc::clone(&self.backend),
            Arc::clone(&self.store),
            Arc::clone(&self.in_flight),
            key.clone(),
            ticket,
        )
        .boxed()
        .shared();
        in_flight.insert(
            key,
            InFlight {
                ticket,
                future: future.clone(),
            },
        );
        future
    }
}

async fn run_fetch(
    backend: Arc<dyn CatalogBackend>,
    store: Arc<QueryStore>,
    in_flight: InFlightMap,
    key: QueryKey,
    ticket: FetchTicket,
) -> Result<CachedValue, ApiError> {
    debug!(%key, ticket = ticket.epoch(), "Fetching from backend");
    let result = match &key {
        QueryKey::Books => backend.list_books().await.map(CachedValue::Books),
        QueryKey::Book(id) => backend.get_book(id).await.map(CachedValue::Book),
        QueryKey::BorrowSummary => backend
            .borrow_summary()
            .await
            .map(CachedValue::BorrowSummary),
    };

    if let Ok(value) = &result {
        let tags = key.provided_tags(value);
        store.complete_fetch(key.clone(), value.clone(), tags, ticket);
    }

    let mut in_flight = mutex_lock(&in_flight, SOURCE, "run_fetch");
    if in_flight
        .get(&key)
        .is_some_and(|entry| entry.ticket == ticket)
    {
        in_flight.remove(&key);
    }
    result
}

fn expect_shape<T>(value: Option<T>, expected: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::decode(format!("cached value is not {expected}")))
}
