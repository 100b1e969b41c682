//! Business logic services

pub mod auth;
pub mod catalog;
pub mod circulation;
pub mod email;
pub mod library_store;
pub mod loans;
pub mod members;
pub mod stats;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub library: Arc<library_store::LibraryStore>,
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub members: members::MembersService,
    pub loans: loans::LoansService,
    pub stats: stats::StatsService,
    pub email: email::EmailService,
}

impl Services {
    /// Wire all services over one repository and one set of live mirrors
    pub fn new(
        repository: Repository,
        library: Arc<library_store::LibraryStore>,
        notifier: Arc<dyn email::Notifier>,
        config: &AppConfig,
    ) -> Self {
        let email = email::EmailService::new(notifier);
        Self {
            auth: auth::AuthService::new(config.auth.clone()),
            catalog: catalog::CatalogService::new(repository.clone(), library.clone()),
            members: members::MembersService::new(library.clone()),
            loans: loans::LoansService::new(repository, library.clone(), email.clone(), config.loans.clone()),
            stats: stats::StatsService::new(library.clone()),
            email,
            library,
        }
    }
}
