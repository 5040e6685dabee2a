use kennel_desk::boarding::{
    sample_roster, BoardingService, DogRosterImporter, InMemoryBoardingStore,
    InMemoryPricingCatalog, PriceListImporter, RosterImportError,
};
use kennel_desk::config::BoardingConfig;
use kennel_desk::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type BoardingApi = BoardingService<InMemoryBoardingStore, InMemoryPricingCatalog>;

/// Build the in-memory boarding service, seeding dogs and prices from the
/// configured CSV files or the built-in samples.
pub(crate) fn build_boarding_service(config: &BoardingConfig) -> Result<Arc<BoardingApi>, AppError> {
    let store = InMemoryBoardingStore::with_kennels(config.kennel_count);

    let dogs = match &config.dog_roster_csv {
        Some(path) => DogRosterImporter::from_path(path)?,
        None => sample_roster(),
    };
    let dog_count = dogs.len();
    for dog in dogs {
        let id = dog.id;
        store
            .register_dog(dog)
            .map_err(|_| RosterImportError::DuplicateId {
                table: "dog",
                id: id.0,
            })?;
    }

    let catalog = match &config.pricing_csv {
        Some(path) => InMemoryPricingCatalog::new(PriceListImporter::from_path(path)?),
        None => InMemoryPricingCatalog::seeded(),
    };

    info!(
        kennels = config.kennel_count,
        dogs = dog_count,
        roster = ?config.dog_roster_csv,
        pricing = ?config.pricing_csv,
        "boarding store seeded"
    );

    Ok(Arc::new(BoardingService::new(
        Arc::new(store),
        Arc::new(catalog),
    )))
}
