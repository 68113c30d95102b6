//! Business logic services

pub mod books;
pub mod lending;
pub mod storage;
pub mod users;

use std::sync::Arc;

use crate::{config::AuthConfig, repository::{LendingStore, Repository}};

use storage::FileStorage;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: books::BookService,
    pub lending: lending::LendingService,
    pub users: users::UsersService,
    store: Arc<dyn LendingStore>,
}

impl Services {
    /// Create all services backed by the Postgres repository
    pub fn new(repository: Repository, auth_config: AuthConfig, storage: Arc<dyn FileStorage>) -> Self {
        let users = users::UsersService::new(Arc::new(repository.users.clone()), auth_config);
        Self::with_store(Arc::new(repository), storage, users)
    }

    /// Create the lending services on top of any store
    pub fn with_store(
        store: Arc<dyn LendingStore>,
        storage: Arc<dyn FileStorage>,
        users: users::UsersService,
    ) -> Self {
        Self {
            books: books::BookService::new(store.clone(), storage),
            lending: lending::LendingService::new(store.clone()),
            users,
            store,
        }
    }

    /// Whether the backing store is reachable
    pub async fn ready(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Readiness check failed");
                false
            }
        }
    }
}
