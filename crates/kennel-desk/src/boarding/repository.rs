use super::domain::{
    Booking, BookingId, ClientId, Dog, DogId, Estimate, EstimateId, Invoice, InvoiceId, Kennel,
    KennelNumber, NewBooking, NewEstimate, NewInvoice, PricingDraft, PricingId, ServicePricing,
};

/// Dog and kennel lookups.
pub trait KennelRepository: Send + Sync {
    fn dog(&self, id: DogId) -> Result<Option<Dog>, RepositoryError>;
    fn kennel(&self, number: KennelNumber) -> Result<Option<Kennel>, RepositoryError>;
    fn kennels(&self) -> Result<Vec<Kennel>, RepositoryError>;
    fn update_kennel(&self, kennel: Kennel) -> Result<(), RepositoryError>;
}

pub trait BookingRepository: Send + Sync {
    fn insert_booking(&self, booking: NewBooking) -> Result<Booking, RepositoryError>;
    fn update_booking(&self, booking: Booking) -> Result<(), RepositoryError>;
    fn booking(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError>;
    /// Every booking for the dog regardless of status or service.
    fn bookings_for_dog(&self, dog: DogId) -> Result<Vec<Booking>, RepositoryError>;
    /// Every booking carrying the kennel number regardless of status.
    fn bookings_for_kennel(&self, kennel: KennelNumber) -> Result<Vec<Booking>, RepositoryError>;
    fn delete_booking(&self, id: BookingId) -> Result<(), RepositoryError>;
}

/// Estimates and invoices.
pub trait LedgerRepository: Send + Sync {
    fn insert_estimate(&self, estimate: NewEstimate) -> Result<Estimate, RepositoryError>;
    fn update_estimate(&self, estimate: Estimate) -> Result<(), RepositoryError>;
    fn estimate(&self, id: EstimateId) -> Result<Option<Estimate>, RepositoryError>;
    fn estimates_for_booking(&self, booking: BookingId) -> Result<Vec<Estimate>, RepositoryError>;
    fn estimates_for_client(&self, client: ClientId) -> Result<Vec<Estimate>, RepositoryError>;
    fn delete_estimate(&self, id: EstimateId) -> Result<(), RepositoryError>;

    fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, RepositoryError>;
    fn update_invoice(&self, invoice: Invoice) -> Result<(), RepositoryError>;
    fn invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError>;
    fn invoices_for_booking(&self, booking: BookingId) -> Result<Vec<Invoice>, RepositoryError>;
    fn invoices_for_estimate(&self, estimate: EstimateId)
        -> Result<Vec<Invoice>, RepositoryError>;
    fn delete_invoice(&self, id: InvoiceId) -> Result<(), RepositoryError>;
}

/// Everything the boarding service persists, behind one handle.
pub trait BoardingStore: KennelRepository + BookingRepository + LedgerRepository {}

impl<T> BoardingStore for T where T: KennelRepository + BookingRepository + LedgerRepository {}

/// Configurable price list. Rows are soft-deleted, never removed.
pub trait PricingCatalog: Send + Sync {
    fn active_pricing(&self) -> Result<Vec<ServicePricing>, RepositoryError>;
    fn upsert_pricing(&self, draft: PricingDraft) -> Result<ServicePricing, RepositoryError>;
    fn deactivate_pricing(&self, id: PricingId) -> Result<ServicePricing, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
