//! Process-local stores backing the HTTP service, the CLI demo, and tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    Booking, BookingId, ClientId, Dog, DogId, Estimate, EstimateId, Invoice, InvoiceId, Kennel,
    KennelNumber, NewBooking, NewEstimate, NewInvoice, PricingDraft, PricingId, ServicePricing,
};
use super::pricing::default_price_list;
use super::repository::{
    BookingRepository, KennelRepository, LedgerRepository, PricingCatalog, RepositoryError,
};

#[derive(Default)]
struct BoardingState {
    dogs: BTreeMap<DogId, Dog>,
    kennels: BTreeMap<KennelNumber, Kennel>,
    bookings: BTreeMap<BookingId, Booking>,
    estimates: BTreeMap<EstimateId, Estimate>,
    invoices: BTreeMap<InvoiceId, Invoice>,
    last_booking: u64,
    last_estimate: u64,
    last_invoice: u64,
}

/// Kennels, bookings, and the estimate/invoice ledger behind one mutex.
#[derive(Default, Clone)]
pub struct InMemoryBoardingStore {
    state: Arc<Mutex<BoardingState>>,
}

impl InMemoryBoardingStore {
    /// Store holding kennels `1..=count`, all available.
    pub fn with_kennels(count: u32) -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.state.lock() {
            state.kennels = (1..=count)
                .map(KennelNumber)
                .map(|number| (number, Kennel::available(number)))
                .collect();
        }
        store
    }

    pub fn register_dog(&self, dog: Dog) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        if state.dogs.contains_key(&dog.id) {
            return Err(RepositoryError::Conflict);
        }
        state.dogs.insert(dog.id, dog);
        Ok(())
    }

    pub fn dogs_for_client(&self, client: ClientId) -> Result<Vec<Dog>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .dogs
            .values()
            .filter(|dog| dog.client_id == client)
            .cloned()
            .collect())
    }

    pub fn bookings(&self) -> Result<Vec<Booking>, RepositoryError> {
        Ok(self.lock()?.bookings.values().cloned().collect())
    }

    pub fn estimates(&self) -> Result<Vec<Estimate>, RepositoryError> {
        Ok(self.lock()?.estimates.values().cloned().collect())
    }

    pub fn invoices(&self) -> Result<Vec<Invoice>, RepositoryError> {
        Ok(self.lock()?.invoices.values().cloned().collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BoardingState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("boarding store mutex poisoned".to_string()))
    }
}

impl KennelRepository for InMemoryBoardingStore {
    fn dog(&self, id: DogId) -> Result<Option<Dog>, RepositoryError> {
        Ok(self.lock()?.dogs.get(&id).cloned())
    }

    fn kennel(&self, number: KennelNumber) -> Result<Option<Kennel>, RepositoryError> {
        Ok(self.lock()?.kennels.get(&number).cloned())
    }

    fn kennels(&self) -> Result<Vec<Kennel>, RepositoryError> {
        Ok(self.lock()?.kennels.values().cloned().collect())
    }

    fn update_kennel(&self, kennel: Kennel) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        match state.kennels.get_mut(&kennel.number) {
            Some(slot) => {
                *slot = kennel;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

impl BookingRepository for InMemoryBoardingStore {
    fn insert_booking(&self, booking: NewBooking) -> Result<Booking, RepositoryError> {
        let mut state = self.lock()?;
        state.last_booking += 1;
        let booking = booking.into_booking(BookingId(state.last_booking));
        state.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    fn update_booking(&self, booking: Booking) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        match state.bookings.get_mut(&booking.id) {
            Some(slot) => {
                *slot = booking;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn booking(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        Ok(self.lock()?.bookings.get(&id).cloned())
    }

    fn bookings_for_dog(&self, dog: DogId) -> Result<Vec<Booking>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .bookings
            .values()
            .filter(|booking| booking.dog_id == dog)
            .cloned()
            .collect())
    }

    fn bookings_for_kennel(&self, kennel: KennelNumber) -> Result<Vec<Booking>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .bookings
            .values()
            .filter(|booking| booking.kennel_number == Some(kennel))
            .cloned()
            .collect())
    }

    fn delete_booking(&self, id: BookingId) -> Result<(), RepositoryError> {
        self.lock()?
            .bookings
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl LedgerRepository for InMemoryBoardingStore {
    fn insert_estimate(&self, estimate: NewEstimate) -> Result<Estimate, RepositoryError> {
        let mut state = self.lock()?;
        state.last_estimate += 1;
        let estimate = estimate.into_estimate(EstimateId(state.last_estimate));
        state.estimates.insert(estimate.id, estimate.clone());
        Ok(estimate)
    }

    fn update_estimate(&self, estimate: Estimate) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        match state.estimates.get_mut(&estimate.id) {
            Some(slot) => {
                *slot = estimate;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn estimate(&self, id: EstimateId) -> Result<Option<Estimate>, RepositoryError> {
        Ok(self.lock()?.estimates.get(&id).cloned())
    }

    fn estimates_for_booking(&self, booking: BookingId) -> Result<Vec<Estimate>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .estimates
            .values()
            .filter(|estimate| estimate.booking_id == Some(booking))
            .cloned()
            .collect())
    }

    fn estimates_for_client(&self, client: ClientId) -> Result<Vec<Estimate>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .estimates
            .values()
            .filter(|estimate| estimate.client_id == client)
            .cloned()
            .collect())
    }

    fn delete_estimate(&self, id: EstimateId) -> Result<(), RepositoryError> {
        self.lock()?
            .estimates
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, RepositoryError> {
        let mut state = self.lock()?;
        state.last_invoice += 1;
        let invoice = invoice.into_invoice(InvoiceId(state.last_invoice));
        state.invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    fn update_invoice(&self, invoice: Invoice) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        match state.invoices.get_mut(&invoice.id) {
            Some(slot) => {
                *slot = invoice;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        Ok(self.lock()?.invoices.get(&id).cloned())
    }

    fn invoices_for_booking(&self, booking: BookingId) -> Result<Vec<Invoice>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .invoices
            .values()
            .filter(|invoice| invoice.booking_id == Some(booking))
            .cloned()
            .collect())
    }

    fn invoices_for_estimate(&self, estimate: EstimateId) -> Result<Vec<Invoice>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .invoices
            .values()
            .filter(|invoice| invoice.estimate_id == Some(estimate))
            .cloned()
            .collect())
    }

    fn delete_invoice(&self, id: InvoiceId) -> Result<(), RepositoryError> {
        self.lock()?
            .invoices
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

/// Price list kept in memory. Deactivated rows stay in the map.
#[derive(Default, Clone)]
pub struct InMemoryPricingCatalog {
    rows: Arc<Mutex<BTreeMap<PricingId, ServicePricing>>>,
}

impl InMemoryPricingCatalog {
    pub fn new(rows: Vec<ServicePricing>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows.into_iter().map(|row| (row.id, row)).collect())),
        }
    }

    /// Catalog holding the built-in price list.
    pub fn seeded() -> Self {
        Self::new(default_price_list())
    }

    pub fn all_pricing(&self) -> Result<Vec<ServicePricing>, RepositoryError> {
        Ok(self.lock()?.values().cloned().collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<PricingId, ServicePricing>>, RepositoryError> {
        self.rows
            .lock()
            .map_err(|_| RepositoryError::Unavailable("pricing mutex poisoned".to_string()))
    }
}

impl PricingCatalog for InMemoryPricingCatalog {
    fn active_pricing(&self) -> Result<Vec<ServicePricing>, RepositoryError> {
        Ok(self
            .lock()?
            .values()
            .filter(|row| row.is_active)
            .cloned()
            .collect())
    }

    fn upsert_pricing(&self, draft: PricingDraft) -> Result<ServicePricing, RepositoryError> {
        let mut rows = self.lock()?;
        let id = match draft.id {
            Some(id) if rows.contains_key(&id) => id,
            Some(_) => return Err(RepositoryError::NotFound),
            None => PricingId(rows.keys().map(|id| id.0).max().unwrap_or(0) + 1),
        };
        let row = ServicePricing {
            id,
            service_type: draft.service_type,
            service_name: draft.service_name,
            price_per_unit: draft.price_per_unit,
            unit: draft.unit,
            is_active: true,
        };
        rows.insert(id, row.clone());
        Ok(row)
    }

    fn deactivate_pricing(&self, id: PricingId) -> Result<ServicePricing, RepositoryError> {
        let mut rows = self.lock()?;
        let row = rows.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        row.is_active = false;
        Ok(row.clone())
    }
}
