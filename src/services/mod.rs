//! Business logic services

pub mod rental_requests;

use std::sync::Arc;

use crate::{
    config::ScoringConfig,
    repository::RequestStore,
    rotation::SeniorityScoringRules,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub rental_requests: rental_requests::RentalRequestService,
}

impl Services {
    /// Create all services over the given store
    pub fn new(store: Arc<dyn RequestStore>, scoring: &ScoringConfig) -> Self {
        let rules = Arc::new(SeniorityScoringRules::from(scoring));

        Self {
            rental_requests: rental_requests::RentalRequestService::new(store, rules),
        }
    }
}
