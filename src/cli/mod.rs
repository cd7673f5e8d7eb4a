//! Terminal views over the catalog service.

mod handlers;
mod io;
mod print;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use shelfmark::{
    application::{catalog::CatalogService, error::AppError},
    cache::{CacheConfig, QueryStore},
    config::{Command, Settings},
    infra::http::ApiClient,
};

/// Everything a command handler needs.
#[derive(Clone)]
pub struct Ctx {
    pub catalog: CatalogService,
}

impl Ctx {
    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let client = ApiClient::new(&settings.api)?;
        Ok(Self::with_client(client, CacheConfig::from(&settings.cache)))
    }

    /// Context against an arbitrary base URL with default cache settings.
    #[cfg(test)]
    pub fn for_base_url(base: &str) -> Result<Self, AppError> {
        use reqwest::{Client, Url};

        let base = Url::parse(base).map_err(|err| AppError::validation(err.to_string()))?;
        let client = ApiClient::with_client(Client::new(), base)?;
        Ok(Self::with_client(client, CacheConfig::default()))
    }

    fn with_client(client: ApiClient, cache: CacheConfig) -> Self {
        let store = Arc::new(QueryStore::new(cache));
        Self {
            catalog: CatalogService::new(Arc::new(client), store),
        }
    }
}

pub async fn dispatch(ctx: &Ctx, command: Command) -> Result<(), AppError> {
    match command {
        Command::Books(args) => handlers::books::handle(ctx, args.action).await,
        Command::Borrow(args) => handlers::borrow::handle(ctx, args).await,
        Command::Summary(args) => handlers::summary::handle(ctx, args).await,
    }
}
