use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::boarding::availability::Occupant;
use crate::boarding::contract::{BookingRequest, KennelAssignmentRequest};
use crate::boarding::domain::{
    Booking, BookingId, ClientId, Dog, DogId, Estimate, EstimateId, Invoice, InvoiceId, Kennel,
    KennelNumber, NewBooking, NewEstimate, NewInvoice, PricingDraft, PricingId, ServicePricing,
    ServiceType, StayWindow, TrainingType,
};
use crate::boarding::memory::{InMemoryBoardingStore, InMemoryPricingCatalog};
use crate::boarding::repository::{
    BookingRepository, KennelRepository, LedgerRepository, PricingCatalog, RepositoryError,
};
use crate::boarding::service::BoardingService;

pub(super) const CLIENT_A: ClientId = ClientId(1);
pub(super) const CLIENT_B: ClientId = ClientId(2);

pub(super) type MemoryService = BoardingService<InMemoryBoardingStore, InMemoryPricingCatalog>;

pub(super) fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).expect("valid date")
}

pub(super) fn stay(from: u32, to: u32) -> StayWindow {
    StayWindow::new(day(from), day(to)).expect("valid stay")
}

pub(super) fn dog(id: u64, client: ClientId) -> Dog {
    Dog {
        id: DogId(id),
        client_id: client,
        name: format!("Dog {id}"),
        breed: None,
        care_instructions: None,
    }
}

pub(super) fn occupant(dog_id: u64, client: ClientId, from: u32, to: u32) -> Occupant {
    Occupant {
        dog_id: DogId(dog_id),
        client_id: client,
        stay: stay(from, to),
    }
}

/// Dogs 12, 50, and 51 belong to client A; dog 99 to client B.
pub(super) fn seeded_store() -> Arc<InMemoryBoardingStore> {
    let store = InMemoryBoardingStore::with_kennels(10);
    for dog in [
        dog(12, CLIENT_A),
        dog(50, CLIENT_A),
        dog(51, CLIENT_A),
        dog(99, CLIENT_B),
    ] {
        store.register_dog(dog).expect("dog registers");
    }
    Arc::new(store)
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryBoardingStore>,
    Arc<InMemoryPricingCatalog>,
) {
    let store = seeded_store();
    let catalog = Arc::new(InMemoryPricingCatalog::seeded());
    let service = BoardingService::new(store.clone(), catalog.clone());
    (service, store, catalog)
}

pub(super) fn assignment(kennel: u32, dogs: &[u64], from: u32, to: u32) -> KennelAssignmentRequest {
    KennelAssignmentRequest {
        kennel_ids: vec![KennelNumber(kennel)],
        dog_ids: dogs.iter().copied().map(DogId).collect(),
        check_in_date: day(from),
        check_out_date: day(to),
    }
}

pub(super) fn boarding_request(
    client: ClientId,
    dog_id: u64,
    from: u32,
    to: Option<u32>,
    kennel: Option<u32>,
) -> BookingRequest {
    BookingRequest {
        client_id: client,
        dog_id: DogId(dog_id),
        service_type: ServiceType::Boarding,
        training_type: None,
        start_date: day(from),
        end_date: to.map(day),
        start_time: None,
        end_time: None,
        duration: None,
        kennel_number: kennel.map(KennelNumber),
        staff_id: None,
    }
}

pub(super) fn training_request(
    client: ClientId,
    dog_id: u64,
    training_type: TrainingType,
) -> BookingRequest {
    BookingRequest {
        service_type: ServiceType::Training,
        training_type: Some(training_type),
        end_date: None,
        ..boarding_request(client, dog_id, 3, None, None)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Price list that cannot be read.
pub(super) struct OfflineCatalog;

impl PricingCatalog for OfflineCatalog {
    fn active_pricing(&self) -> Result<Vec<ServicePricing>, RepositoryError> {
        Err(RepositoryError::Unavailable("pricing offline".to_string()))
    }

    fn upsert_pricing(&self, _draft: PricingDraft) -> Result<ServicePricing, RepositoryError> {
        Err(RepositoryError::Unavailable("pricing offline".to_string()))
    }

    fn deactivate_pricing(&self, _id: PricingId) -> Result<ServicePricing, RepositoryError> {
        Err(RepositoryError::Unavailable("pricing offline".to_string()))
    }
}

/// Store whose every call fails.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl KennelRepository for UnavailableStore {
    fn dog(&self, _id: DogId) -> Result<Option<Dog>, RepositoryError> {
        offline()
    }

    fn kennel(&self, _number: KennelNumber) -> Result<Option<Kennel>, RepositoryError> {
        offline()
    }

    fn kennels(&self) -> Result<Vec<Kennel>, RepositoryError> {
        offline()
    }

    fn update_kennel(&self, _kennel: Kennel) -> Result<(), RepositoryError> {
        offline()
    }
}

impl BookingRepository for UnavailableStore {
    fn insert_booking(&self, _booking: NewBooking) -> Result<Booking, RepositoryError> {
        offline()
    }

    fn update_booking(&self, _booking: Booking) -> Result<(), RepositoryError> {
        offline()
    }

    fn booking(&self, _id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        offline()
    }

    fn bookings_for_dog(&self, _dog: DogId) -> Result<Vec<Booking>, RepositoryError> {
        offline()
    }

    fn bookings_for_kennel(&self, _kennel: KennelNumber) -> Result<Vec<Booking>, RepositoryError> {
        offline()
    }

    fn delete_booking(&self, _id: BookingId) -> Result<(), RepositoryError> {
        offline()
    }
}

impl LedgerRepository for UnavailableStore {
    fn insert_estimate(&self, _estimate: NewEstimate) -> Result<Estimate, RepositoryError> {
        offline()
    }

    fn update_estimate(&self, _estimate: Estimate) -> Result<(), RepositoryError> {
        offline()
    }

    fn estimate(&self, _id: EstimateId) -> Result<Option<Estimate>, RepositoryError> {
        offline()
    }

    fn estimates_for_booking(&self, _booking: BookingId) -> Result<Vec<Estimate>, RepositoryError> {
        offline()
    }

    fn estimates_for_client(&self, _client: ClientId) -> Result<Vec<Estimate>, RepositoryError> {
        offline()
    }

    fn delete_estimate(&self, _id: EstimateId) -> Result<(), RepositoryError> {
        offline()
    }

    fn insert_invoice(&self, _invoice: NewInvoice) -> Result<Invoice, RepositoryError> {
        offline()
    }

    fn update_invoice(&self, _invoice: Invoice) -> Result<(), RepositoryError> {
        offline()
    }

    fn invoice(&self, _id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        offline()
    }

    fn invoices_for_booking(&self, _booking: BookingId) -> Result<Vec<Invoice>, RepositoryError> {
        offline()
    }

    fn invoices_for_estimate(&self, _estimate: EstimateId) -> Result<Vec<Invoice>, RepositoryError> {
        offline()
    }

    fn delete_invoice(&self, _id: InvoiceId) -> Result<(), RepositoryError> {
        offline()
    }
}

/// In-memory store whose estimate deletes report success but keep the row.
pub(super) struct StickyEstimateStore {
    pub(super) inner: InMemoryBoardingStore,
}

impl KennelRepository for StickyEstimateStore {
    fn dog(&self, id: DogId) -> Result<Option<Dog>, RepositoryError> {
        self.inner.dog(id)
    }

    fn kennel(&self, number: KennelNumber) -> Result<Option<Kennel>, RepositoryError> {
        self.inner.kennel(number)
    }

    fn kennels(&self) -> Result<Vec<Kennel>, RepositoryError> {
        self.inner.kennels()
    }

    fn update_kennel(&self, kennel: Kennel) -> Result<(), RepositoryError> {
        self.inner.update_kennel(kennel)
    }
}

impl BookingRepository for StickyEstimateStore {
    fn insert_booking(&self, booking: NewBooking) -> Result<Booking, RepositoryError> {
        self.inner.insert_booking(booking)
    }

    fn update_booking(&self, booking: Booking) -> Result<(), RepositoryError> {
        self.inner.update_booking(booking)
    }

    fn booking(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        self.inner.booking(id)
    }

    fn bookings_for_dog(&self, dog: DogId) -> Result<Vec<Booking>, RepositoryError> {
        self.inner.bookings_for_dog(dog)
    }

    fn bookings_for_kennel(&self, kennel: KennelNumber) -> Result<Vec<Booking>, RepositoryError> {
        self.inner.bookings_for_kennel(kennel)
    }

    fn delete_booking(&self, id: BookingId) -> Result<(), RepositoryError> {
        self.inner.delete_booking(id)
    }
}

impl LedgerRepository for StickyEstimateStore {
    fn insert_estimate(&self, estimate: NewEstimate) -> Result<Estimate, RepositoryError> {
        self.inner.insert_estimate(estimate)
    }

    fn update_estimate(&self, estimate: Estimate) -> Result<(), RepositoryError> {
        self.inner.update_estimate(estimate)
    }

    fn estimate(&self, id: EstimateId) -> Result<Option<Estimate>, RepositoryError> {
        self.inner.estimate(id)
    }

    fn estimates_for_booking(&self, booking: BookingId) -> Result<Vec<Estimate>, RepositoryError> {
        self.inner.estimates_for_booking(booking)
    }

    fn estimates_for_client(&self, client: ClientId) -> Result<Vec<Estimate>, RepositoryError> {
        self.inner.estimates_for_client(client)
    }

    fn delete_estimate(&self, _id: EstimateId) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, RepositoryError> {
        self.inner.insert_invoice(invoice)
    }

    fn update_invoice(&self, invoice: Invoice) -> Result<(), RepositoryError> {
        self.inner.update_invoice(invoice)
    }

    fn invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        self.inner.invoice(id)
    }

    fn invoices_for_booking(&self, booking: BookingId) -> Result<Vec<Invoice>, RepositoryError> {
        self.inner.invoices_for_booking(booking)
    }

    fn invoices_for_estimate(&self, estimate: EstimateId) -> Result<Vec<Invoice>, RepositoryError> {
        self.inner.invoices_for_estimate(estimate)
    }

    fn delete_invoice(&self, id: InvoiceId) -> Result<(), RepositoryError> {
        self.inner.delete_invoice(id)
    }
}

/// In-memory store that parks the first kennel occupancy read made after
/// [`GatedKennelStore::arm`], until the test has met it twice.
pub(super) struct GatedKennelStore {
    pub(super) inner: InMemoryBoardingStore,
    armed: AtomicBool,
    gate: Barrier,
}

impl GatedKennelStore {
    pub(super) fn new(inner: InMemoryBoardingStore) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
            gate: Barrier::new(2),
        }
    }

    pub(super) fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// First call returns once the reader is parked; the second lets it go.
    pub(super) fn meet(&self) {
        self.gate.wait();
    }
}

impl KennelRepository for GatedKennelStore {
    fn dog(&self, id: DogId) -> Result<Option<Dog>, RepositoryError> {
        self.inner.dog(id)
    }

    fn kennel(&self, number: KennelNumber) -> Result<Option<Kennel>, RepositoryError> {
        self.inner.kennel(number)
    }

    fn kennels(&self) -> Result<Vec<Kennel>, RepositoryError> {
        self.inner.kennels()
    }

    fn update_kennel(&self, kennel: Kennel) -> Result<(), RepositoryError> {
        self.inner.update_kennel(kennel)
    }
}

impl BookingRepository for GatedKennelStore {
    fn insert_booking(&self, booking: NewBooking) -> Result<Booking, RepositoryError> {
        self.inner.insert_booking(booking)
    }

    fn update_booking(&self, booking: Booking) -> Result<(), RepositoryError> {
        self.inner.update_booking(booking)
    }

    fn booking(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        self.inner.booking(id)
    }

    fn bookings_for_dog(&self, dog: DogId) -> Result<Vec<Booking>, RepositoryError> {
        self.inner.bookings_for_dog(dog)
    }

    fn bookings_for_kennel(&self, kennel: KennelNumber) -> Result<Vec<Booking>, RepositoryError> {
        let rows = self.inner.bookings_for_kennel(kennel)?;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.gate.wait();
            self.gate.wait();
        }
        Ok(rows)
    }

    fn delete_booking(&self, id: BookingId) -> Result<(), RepositoryError> {
        self.inner.delete_booking(id)
    }
}

impl LedgerRepository for GatedKennelStore {
    fn insert_estimate(&self, estimate: NewEstimate) -> Result<Estimate, RepositoryError> {
        self.inner.insert_estimate(estimate)
    }

    fn update_estimate(&self, estimate: Estimate) -> Result<(), RepositoryError> {
        self.inner.update_estimate(estimate)
    }

    fn estimate(&self, id: EstimateId) -> Result<Option<Estimate>, RepositoryError> {
        self.inner.estimate(id)
    }

    fn estimates_for_booking(&self, booking: BookingId) -> Result<Vec<Estimate>, RepositoryError> {
        self.inner.estimates_for_booking(booking)
    }

    fn estimates_for_client(&self, client: ClientId) -> Result<Vec<Estimate>, RepositoryError> {
        self.inner.estimates_for_client(client)
    }

    fn delete_estimate(&self, id: EstimateId) -> Result<(), RepositoryError> {
        self.inner.delete_estimate(id)
    }

    fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, RepositoryError> {
        self.inner.insert_invoice(invoice)
    }

    fn update_invoice(&self, invoice: Invoice) -> Result<(), RepositoryError> {
        self.inner.update_invoice(invoice)
    }

    fn invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        self.inner.invoice(id)
    }

    fn invoices_for_booking(&self, booking: BookingId) -> Result<Vec<Invoice>, RepositoryError> {
        self.inner.invoices_for_booking(booking)
    }

    fn invoices_for_estimate(&self, estimate: EstimateId) -> Result<Vec<Invoice>, RepositoryError> {
        self.inner.invoices_for_estimate(estimate)
    }

    fn delete_invoice(&self, id: InvoiceId) -> Result<(), RepositoryError> {
        self.inner.delete_invoice(id)
    }
}
