use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::slice;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::availability::{AssignmentCheck, AssignmentRejection, AvailabilityChecker};
use super::contract::{BookingRequest, DiscountRequest, KennelAssignmentRequest};
use super::domain::{
    Booking, BookingId, BookingStatus, ClientId, Dog, DogId, Estimate, EstimateId,
    EstimateStatus, Invoice, InvoiceId, Kennel, KennelNumber, KennelStatus, NewBooking,
    PaymentStatus, PricingDraft, PricingId, ServicePricing, ServiceType, StayWindow,
    TrainingType, KENNEL_CAPACITY,
};
use super::estimate::{regroup_estimate, EstimateGenerator};
use super::invoice::{invoice_from_estimate, InvoiceError, DEFAULT_PAYMENT_TERMS_DAYS};
use super::pricing::{PriceQuote, PricingResolver, Quantity};
use super::repository::{BoardingStore, PricingCatalog, RepositoryError};

/// Record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRecord {
    Kennel(KennelNumber),
    Dog(DogId),
    Booking(BookingId),
    Estimate(EstimateId),
    Invoice(InvoiceId),
    Pricing(PricingId),
}

impl fmt::Display for MissingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingRecord::Kennel(number) => write!(f, "kennel {number}"),
            MissingRecord::Dog(id) => write!(f, "dog #{id}"),
            MissingRecord::Booking(id) => write!(f, "booking {id}"),
            MissingRecord::Estimate(id) => write!(f, "estimate {id}"),
            MissingRecord::Invoice(id) => write!(f, "invoice {id}"),
            MissingRecord::Pricing(id) => write!(f, "service pricing {id}"),
        }
    }
}

/// Input problems with a booking request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingValidationError {
    #[error("Boarding bookings require an end date")]
    MissingCheckOut,
    #[error("End date ({end}) must be after start date ({start})")]
    InvalidDates { start: NaiveDate, end: NaiveDate },
    #[error("Duration must be at least 1")]
    ZeroDuration,
    #[error("Only boarding bookings can reserve a kennel")]
    KennelWithoutBoarding,
    #[error("Dog #{dog} does not belong to client #{client}")]
    DogOwnership { dog: DogId, client: ClientId },
    #[error("Service name must not be empty")]
    EmptyServiceName,
}

/// Error raised by the boarding service.
#[derive(Debug, thiserror::Error)]
pub enum BoardingServiceError {
    #[error(transparent)]
    Rejected(#[from] AssignmentRejection),
    #[error(transparent)]
    Invalid(#[from] BookingValidationError),
    #[error(transparent)]
    Invoice(#[from] InvoiceError),
    #[error("{0} not found")]
    NotFound(MissingRecord),
    #[error("{record} {id} still present after delete")]
    DeletionUnconfirmed { record: &'static str, id: u64 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of a kennel assignment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KennelAssignment {
    pub kennel: Kennel,
    pub bookings: Vec<Booking>,
    pub estimates: Vec<Estimate>,
    pub superseded_bookings: Vec<BookingId>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KennelRelease {
    pub kennel: Kennel,
    pub detached_bookings: Vec<BookingId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub booking: Booking,
    pub estimate: Option<Estimate>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationReport {
    pub booking_id: BookingId,
    pub estimates_removed: usize,
    /// Shared estimates re-billed for the dogs still staying.
    pub estimates_revised: usize,
    pub invoices_removed: usize,
    pub booking_deleted: bool,
}

/// Kennel with the active boarding bookings that occupy it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KennelOccupancy {
    pub kennel: Kennel,
    pub occupant_count: usize,
    pub bookings: Vec<Booking>,
}

/// Per-kennel mutexes held across check-and-write so two requests cannot
/// both pass the availability check for the same kennel.
#[derive(Default)]
struct KennelLocks {
    slots: Mutex<HashMap<KennelNumber, Arc<Mutex<()>>>>,
}

impl KennelLocks {
    fn slot(&self, kennel: KennelNumber) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(kennel).or_default().clone()
    }
}

/// Service composing availability rules, pricing, and the booking ledger.
pub struct BoardingService<S, P> {
    store: Arc<S>,
    catalog: Arc<P>,
    availability: AvailabilityChecker<S>,
    estimates: EstimateGenerator<S, P>,
    locks: KennelLocks,
}

impl<S, P> BoardingService<S, P>
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    pub fn new(store: Arc<S>, catalog: Arc<P>) -> Self {
        Self {
            availability: AvailabilityChecker::new(store.clone()),
            estimates: EstimateGenerator::new(store.clone(), catalog.clone()),
            store,
            catalog,
            locks: KennelLocks::default(),
        }
    }

    /// Dry-run of [`Self::assign_kennel`]; nothing is written.
    pub fn check_assignment(
        &self,
        request: &KennelAssignmentRequest,
    ) -> Result<AssignmentCheck, BoardingServiceError> {
        let (kennel_number, dog_ids, stay) = match validate_assignment(request) {
            Ok(parts) => parts,
            Err(rejection) => return Ok(AssignmentCheck::from(Err(rejection))),
        };
        self.require_kennel(kennel_number)?;
        let dogs = self.load_dogs(&dog_ids)?;
        let verdict = self.availability.check(kennel_number, &dogs, stay)?;
        Ok(AssignmentCheck::from(verdict))
    }

    /// Place one or two dogs in a kennel for a stay.
    ///
    /// Existing active boarding bookings for the dogs are superseded, one
    /// confirmed booking per dog is written, the kennel is marked occupied,
    /// and one estimate per client is generated. Estimate failures are
    /// reported as warnings and do not undo the assignment.
    pub fn assign_kennel(
        &self,
        request: KennelAssignmentRequest,
    ) -> Result<KennelAssignment, BoardingServiceError> {
        let (kennel_number, dog_ids, stay) = validate_assignment(&request)?;
        let mut vacated = BTreeSet::new();
        let assignment = self.place_dogs(kennel_number, &dog_ids, stay, &mut vacated);

        // Kennels the dogs moved out of are released one lock at a time, after
        // the target kennel's lock is dropped.
        for previous in vacated {
            self.release_if_vacant(previous)?;
        }
        assignment
    }

    fn place_dogs(
        &self,
        kennel_number: KennelNumber,
        dog_ids: &[DogId],
        stay: StayWindow,
        vacated: &mut BTreeSet<KennelNumber>,
    ) -> Result<KennelAssignment, BoardingServiceError> {
        let slot = self.locks.slot(kennel_number);
        let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let mut kennel = self.require_kennel(kennel_number)?;
        let dogs = self.load_dogs(dog_ids)?;
        self.availability.check(kennel_number, &dogs, stay)??;

        let mut superseded_bookings = Vec::new();
        let mut bookings = Vec::with_capacity(dogs.len());
        for dog in &dogs {
            superseded_bookings.extend(self.supersede_boarding(dog.id, kennel_number, vacated)?);
            let booking = self.store.insert_booking(NewBooking {
                client_id: dog.client_id,
                dog_id: dog.id,
                service_type: ServiceType::Boarding,
                training_type: None,
                start_date: stay.check_in(),
                end_date: Some(stay.check_out()),
                start_time: None,
                end_time: None,
                duration: None,
                kennel_number: Some(kennel_number),
                staff_id: None,
                status: BookingStatus::Confirmed,
            })?;
            bookings.push(booking);
        }

        kennel.status = KennelStatus::Occupied;
        self.store.update_kennel(kennel.clone())?;

        let mut households: BTreeMap<ClientId, Vec<Booking>> = BTreeMap::new();
        for booking in &bookings {
            households
                .entry(booking.client_id)
                .or_default()
                .push(booking.clone());
        }

        let mut estimates = Vec::new();
        let mut warnings = Vec::new();
        for (client_id, group) in households {
            match self.estimates.generate(&group) {
                Ok(estimate) => estimates.push(estimate),
                Err(err) => {
                    warn!(kennel = %kennel_number, client = %client_id, error = %err, "estimate generation failed after kennel assignment");
                    warnings.push(format!(
                        "Kennel assigned, but the estimate for client #{client_id} could not be generated"
                    ));
                }
            }
        }

        info!(
            kennel = %kennel_number,
            dogs = ?dog_ids,
            check_in = %stay.check_in(),
            check_out = %stay.check_out(),
            superseded = superseded_bookings.len(),
            "kennel assigned"
        );

        Ok(KennelAssignment {
            kennel,
            bookings,
            estimates,
            superseded_bookings,
            warnings,
        })
    }

    /// Detach every active booking from the kennel and mark it available.
    pub fn unassign_kennel(
        &self,
        kennel_number: KennelNumber,
    ) -> Result<KennelRelease, BoardingServiceError> {
        let slot = self.locks.slot(kennel_number);
        let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let mut kennel = self.require_kennel(kennel_number)?;
        let mut detached_bookings = Vec::new();
        for mut booking in self.store.bookings_for_kennel(kennel_number)? {
            if !booking.occupies(kennel_number) {
                continue;
            }
            booking.kennel_number = None;
            detached_bookings.push(booking.id);
            self.store.update_booking(booking)?;
        }

        kennel.status = KennelStatus::Available;
        self.store.update_kennel(kennel.clone())?;
        info!(kennel = %kennel_number, detached = detached_bookings.len(), "kennel unassigned");

        Ok(KennelRelease {
            kennel,
            detached_bookings,
        })
    }

    pub fn set_kennel_status(
        &self,
        kennel_number: KennelNumber,
        status: KennelStatus,
    ) -> Result<Kennel, BoardingServiceError> {
        let slot = self.locks.slot(kennel_number);
        let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let mut kennel = self.require_kennel(kennel_number)?;
        kennel.status = status;
        self.store.update_kennel(kennel.clone())?;
        Ok(kennel)
    }

    /// Store a confirmed booking and attach a pending estimate.
    pub fn create_booking(
        &self,
        request: BookingRequest,
    ) -> Result<BookingConfirmation, BoardingServiceError> {
        let stay = validate_booking(&request)?;
        let dog = self
            .store
            .dog(request.dog_id)?
            .ok_or(BoardingServiceError::NotFound(MissingRecord::Dog(request.dog_id)))?;
        if dog.client_id != request.client_id {
            return Err(BookingValidationError::DogOwnership {
                dog: dog.id,
                client: request.client_id,
            }
            .into());
        }

        let new_booking = NewBooking {
            client_id: request.client_id,
            dog_id: request.dog_id,
            service_type: request.service_type,
            training_type: request.training_type,
            start_date: request.start_date,
            end_date: request.end_date,
            start_time: request.start_time,
            end_time: request.end_time,
            duration: request.duration,
            kennel_number: request.kennel_number,
            staff_id: request.staff_id,
            status: BookingStatus::Confirmed,
        };

        let booking = match (request.kennel_number, stay) {
            (Some(kennel_number), Some(stay)) => {
                let slot = self.locks.slot(kennel_number);
                let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

                let mut kennel = self.require_kennel(kennel_number)?;
                self.availability
                    .check(kennel_number, slice::from_ref(&dog), stay)??;
                let booking = self.store.insert_booking(new_booking)?;
                kennel.status = KennelStatus::Occupied;
                self.store.update_kennel(kennel)?;
                booking
            }
            _ => self.store.insert_booking(new_booking)?,
        };

        let (estimate, warning) = match self.estimates.generate(slice::from_ref(&booking)) {
            Ok(estimate) => (Some(estimate), None),
            Err(err) => {
                warn!(booking = %booking.id, error = %err, "estimate generation failed after booking");
                (
                    None,
                    Some("Booking created, but the estimate could not be generated".to_string()),
                )
            }
        };

        info!(
            booking = %booking.id,
            dog = %booking.dog_id,
            service = %booking.service_type,
            "booking created"
        );

        Ok(BookingConfirmation {
            booking,
            estimate,
            warning,
        })
    }

    /// Delete a booking together with every estimate and invoice that
    /// references it. Each delete is confirmed by looking the row up again
    /// rather than trusting the store's own report.
    ///
    /// A pending estimate shared with dogs that are still staying is not
    /// deleted: it is re-billed for those dogs and moved onto one of their
    /// bookings.
    pub fn cancel_booking(
        &self,
        booking_id: BookingId,
    ) -> Result<CancellationReport, BoardingServiceError> {
        let booking = self
            .store
            .booking(booking_id)?
            .ok_or(BoardingServiceError::NotFound(MissingRecord::Booking(booking_id)))?;

        let estimates_revised = self.withdraw_from_shared_estimates(&booking)?.len();
        let estimates = self.store.estimates_for_booking(booking_id)?;
        let mut invoice_ids: BTreeSet<InvoiceId> = self
            .store
            .invoices_for_booking(booking_id)?
            .into_iter()
            .map(|invoice| invoice.id)
            .collect();
        for estimate in &estimates {
            invoice_ids.extend(
                self.store
                    .invoices_for_estimate(estimate.id)?
                    .into_iter()
                    .map(|invoice| invoice.id),
            );
        }

        let mut estimates_removed = 0;
        for estimate in &estimates {
            let id = estimate.id;
            if confirm_removed(
                "estimate",
                id.0,
                || self.store.estimate(id),
                || self.store.delete_estimate(id),
            )? {
                estimates_removed += 1;
            }
        }

        let mut invoices_removed = 0;
        for id in invoice_ids {
            if confirm_removed(
                "invoice",
                id.0,
                || self.store.invoice(id),
                || self.store.delete_invoice(id),
            )? {
                invoices_removed += 1;
            }
        }

        let booking_deleted = confirm_removed(
            "booking",
            booking_id.0,
            || self.store.booking(booking_id),
            || self.store.delete_booking(booking_id),
        )?;

        if let Some(orphan) = self.store.estimates_for_booking(booking_id)?.first() {
            return Err(BoardingServiceError::DeletionUnconfirmed {
                record: "estimate",
                id: orphan.id.0,
            });
        }
        if let Some(orphan) = self.store.invoices_for_booking(booking_id)?.first() {
            return Err(BoardingServiceError::DeletionUnconfirmed {
                record: "invoice",
                id: orphan.id.0,
            });
        }

        if let Some(kennel_number) = booking.kennel_number {
            self.release_if_vacant(kennel_number)?;
        }

        info!(
            booking = %booking_id,
            estimates_removed,
            estimates_revised,
            invoices_removed,
            "booking cancelled"
        );

        Ok(CancellationReport {
            booking_id,
            estimates_removed,
            estimates_revised,
            invoices_removed,
            booking_deleted,
        })
    }

    /// Delete one estimate, leaving its booking in place.
    pub fn cancel_estimate(&self, estimate_id: EstimateId) -> Result<(), BoardingServiceError> {
        let removed = confirm_removed(
            "estimate",
            estimate_id.0,
            || self.store.estimate(estimate_id),
            || self.store.delete_estimate(estimate_id),
        )?;
        if !removed {
            return Err(BoardingServiceError::NotFound(MissingRecord::Estimate(
                estimate_id,
            )));
        }
        info!(estimate = %estimate_id, "estimate cancelled");
        Ok(())
    }

    pub fn convert_estimate(
        &self,
        estimate_id: EstimateId,
        issue_date: NaiveDate,
        due_in_days: Option<u32>,
    ) -> Result<Invoice, BoardingServiceError> {
        let mut estimate = self
            .store
            .estimate(estimate_id)?
            .ok_or(BoardingServiceError::NotFound(MissingRecord::Estimate(estimate_id)))?;

        let draft = invoice_from_estimate(
            &estimate,
            issue_date,
            due_in_days.unwrap_or(DEFAULT_PAYMENT_TERMS_DAYS),
        )?;
        let invoice = self.store.insert_invoice(draft)?;

        estimate.status = EstimateStatus::ConvertedToInvoice;
        self.store.update_estimate(estimate)?;
        info!(estimate = %estimate_id, invoice = %invoice.id, amount = invoice.amount, "estimate invoiced");
        Ok(invoice)
    }

    pub fn apply_discount(
        &self,
        invoice_id: InvoiceId,
        request: DiscountRequest,
    ) -> Result<Invoice, BoardingServiceError> {
        let mut invoice = self.require_invoice(invoice_id)?;
        invoice.apply_discount(request.discount_amount, request.discount_reason)?;
        self.store.update_invoice(invoice.clone())?;
        Ok(invoice)
    }

    pub fn record_payment(
        &self,
        invoice_id: InvoiceId,
        status: PaymentStatus,
    ) -> Result<Invoice, BoardingServiceError> {
        let mut invoice = self.require_invoice(invoice_id)?;
        invoice.payment_status = status;
        self.store.update_invoice(invoice.clone())?;
        Ok(invoice)
    }

    pub fn estimates_for_client(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<Estimate>, BoardingServiceError> {
        let mut estimates = self.store.estimates_for_client(client_id)?;
        estimates.sort_by_key(|estimate| estimate.id);
        Ok(estimates)
    }

    /// Every kennel with the active boarding bookings it holds, optionally
    /// narrowed to bookings covering `on`.
    pub fn kennels_with_bookings(
        &self,
        on: Option<NaiveDate>,
    ) -> Result<Vec<KennelOccupancy>, BoardingServiceError> {
        let mut kennels = self.store.kennels()?;
        kennels.sort_by_key(|kennel| kennel.number);

        kennels
            .into_iter()
            .map(|kennel| -> Result<KennelOccupancy, BoardingServiceError> {
                let bookings = self.occupying_bookings(kennel.number, on)?;
                let occupant_count = bookings
                    .iter()
                    .map(|booking| booking.dog_id)
                    .collect::<BTreeSet<_>>()
                    .len();
                Ok(KennelOccupancy {
                    kennel,
                    occupant_count,
                    bookings,
                })
            })
            .collect()
    }

    /// Bookings occupying the kennel on the given day.
    pub fn current_occupants(
        &self,
        kennel_number: KennelNumber,
        on: NaiveDate,
    ) -> Result<Vec<Booking>, BoardingServiceError> {
        self.require_kennel(kennel_number)?;
        self.occupying_bookings(kennel_number, Some(on))
    }

    pub fn quote(
        &self,
        service: ServiceType,
        training_type: Option<TrainingType>,
        quantity: Quantity,
    ) -> Result<PriceQuote, BoardingServiceError> {
        let resolver = PricingResolver::new(self.catalog.active_pricing()?);
        Ok(resolver.resolve(service, training_type, quantity))
    }

    pub fn price_list(&self) -> Result<Vec<ServicePricing>, BoardingServiceError> {
        let mut rows = self.catalog.active_pricing()?;
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    pub fn upsert_price(&self, draft: PricingDraft) -> Result<ServicePricing, BoardingServiceError> {
        if draft.service_name.trim().is_empty() {
            return Err(BookingValidationError::EmptyServiceName.into());
        }
        let id = draft.id;
        let row = self.catalog.upsert_pricing(draft).map_err(|err| match (err, id) {
            (RepositoryError::NotFound, Some(id)) => {
                BoardingServiceError::NotFound(MissingRecord::Pricing(id))
            }
            (err, _) => err.into(),
        })?;
        info!(pricing = %row.id, service = %row.service_type, price = row.price_per_unit, "price list updated");
        Ok(row)
    }

    pub fn deactivate_price(&self, id: PricingId) -> Result<ServicePricing, BoardingServiceError> {
        self.catalog.deactivate_pricing(id).map_err(|err| match err {
            RepositoryError::NotFound => BoardingServiceError::NotFound(MissingRecord::Pricing(id)),
            other => other.into(),
        })
    }

    fn require_kennel(&self, number: KennelNumber) -> Result<Kennel, BoardingServiceError> {
        self.store
            .kennel(number)?
            .ok_or(BoardingServiceError::NotFound(MissingRecord::Kennel(number)))
    }

    fn require_invoice(&self, id: InvoiceId) -> Result<Invoice, BoardingServiceError> {
        self.store
            .invoice(id)?
            .ok_or(BoardingServiceError::NotFound(MissingRecord::Invoice(id)))
    }

    fn load_dogs(&self, dog_ids: &[DogId]) -> Result<Vec<Dog>, BoardingServiceError> {
        dog_ids
            .iter()
            .map(|id| {
                self.store
                    .dog(*id)?
                    .ok_or(BoardingServiceError::NotFound(MissingRecord::Dog(*id)))
            })
            .collect()
    }

    fn occupying_bookings(
        &self,
        kennel_number: KennelNumber,
        on: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, BoardingServiceError> {
        let mut bookings: Vec<Booking> = self
            .store
            .bookings_for_kennel(kennel_number)?
            .into_iter()
            .filter(|booking| booking.occupies(kennel_number))
            .filter(|booking| match (on, booking.stay()) {
                (Some(day), Some(stay)) => stay.covers(day),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .collect();
        bookings.sort_by_key(|booking| (booking.start_date, booking.id));
        Ok(bookings)
    }

    /// Cancel the dog's active boarding bookings ahead of a new assignment
    /// and withdraw their pending estimates. Kennels the dog leaves are added
    /// to `vacated` for the caller to release.
    fn supersede_boarding(
        &self,
        dog_id: DogId,
        target: KennelNumber,
        vacated: &mut BTreeSet<KennelNumber>,
    ) -> Result<Vec<BookingId>, BoardingServiceError> {
        let mut superseded = Vec::new();

        for mut booking in self.store.bookings_for_dog(dog_id)? {
            if booking.service_type != ServiceType::Boarding || !booking.status.is_active() {
                continue;
            }
            let booking_id = booking.id;
            if let Some(previous) = booking.kennel_number.filter(|number| *number != target) {
                vacated.insert(previous);
            }
            booking.status = BookingStatus::Cancelled;
            self.store.update_booking(booking.clone())?;
            self.withdraw_from_shared_estimates(&booking)?;

            for mut estimate in self.store.estimates_for_booking(booking_id)? {
                if estimate.status == EstimateStatus::Pending {
                    estimate.status = EstimateStatus::Cancelled;
                    self.store.update_estimate(estimate)?;
                }
            }
            superseded.push(booking_id);
        }
        Ok(superseded)
    }

    /// Take the leaving booking's dog off pending estimates it shares with
    /// other dogs of the same stay, re-billing each for the dogs still
    /// booked. Estimates with nobody left are untouched.
    fn withdraw_from_shared_estimates(
        &self,
        leaving: &Booking,
    ) -> Result<Vec<Estimate>, BoardingServiceError> {
        let mut shared = self.store.estimates_for_booking(leaving.id)?;
        shared.extend(
            self.store
                .estimates_for_client(leaving.client_id)?
                .into_iter()
                .filter(|estimate| estimate.booking_id != Some(leaving.id))
                .filter(|estimate| estimate.dog_ids.contains(&leaving.dog_id))
                .filter(|estimate| bills_same_stay(estimate, leaving)),
        );

        let mut revised = Vec::new();
        for estimate in shared {
            if estimate.status != EstimateStatus::Pending || estimate.dog_ids.len() < 2 {
                continue;
            }
            let remaining = self.remaining_bookings(&estimate, leaving)?;
            let Some(regrouped) = regroup_estimate(&estimate, &remaining) else {
                continue;
            };
            self.store.update_estimate(regrouped.clone())?;
            info!(
                estimate = %regrouped.id,
                dropped_dog = %leaving.dog_id,
                total = regrouped.total_amount,
                "shared estimate re-billed"
            );
            revised.push(regrouped);
        }
        Ok(revised)
    }

    /// Active bookings of the estimate's other dogs for the same stay.
    fn remaining_bookings(
        &self,
        estimate: &Estimate,
        leaving: &Booking,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let mut remaining = Vec::new();
        for dog_id in estimate.dog_ids.iter().filter(|dog| **dog != leaving.dog_id) {
            let sibling = self
                .store
                .bookings_for_dog(*dog_id)?
                .into_iter()
                .filter(|booking| booking.id != leaving.id && booking.status.is_active())
                .filter(|booking| booking.client_id == estimate.client_id)
                .filter(|booking| bills_same_stay(estimate, booking))
                .min_by_key(|booking| booking.id);
            remaining.extend(sibling);
        }
        remaining.sort_by_key(|booking| booking.id);
        Ok(remaining)
    }

    /// Mark the kennel available once no active booking occupies it. Runs
    /// under the kennel's lock so it cannot overwrite a concurrent
    /// assignment's status.
    fn release_if_vacant(&self, kennel_number: KennelNumber) -> Result<(), BoardingServiceError> {
        let slot = self.locks.slot(kennel_number);
        let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(mut kennel) = self.store.kennel(kennel_number)? else {
            return Ok(());
        };
        if kennel.status != KennelStatus::Occupied {
            return Ok(());
        }
        let still_occupied = self
            .store
            .bookings_for_kennel(kennel_number)?
            .iter()
            .any(|booking| booking.occupies(kennel_number));
        if !still_occupied {
            kennel.status = KennelStatus::Available;
            self.store.update_kennel(kennel)?;
        }
        Ok(())
    }
}

fn bills_same_stay(estimate: &Estimate, booking: &Booking) -> bool {
    estimate.service_type == booking.service_type
        && estimate.check_in_date == booking.start_date
        && estimate.check_out_date == booking.end_date
}

fn validate_assignment(
    request: &KennelAssignmentRequest,
) -> Result<(KennelNumber, Vec<DogId>, StayWindow), AssignmentRejection> {
    let mut dog_ids = Vec::with_capacity(request.dog_ids.len());
    for id in &request.dog_ids {
        if !dog_ids.contains(id) {
            dog_ids.push(*id);
        }
    }
    if dog_ids.is_empty() {
        return Err(AssignmentRejection::NoDogs);
    }
    if dog_ids.len() > KENNEL_CAPACITY {
        return Err(AssignmentRejection::TooManyDogs {
            requested: dog_ids.len(),
        });
    }

    let kennel_number = match request.kennel_ids.as_slice() {
        [number] => *number,
        other => {
            return Err(AssignmentRejection::MultipleKennels {
                requested: other.len(),
            })
        }
    };

    let stay = StayWindow::new(request.check_in_date, request.check_out_date).ok_or(
        AssignmentRejection::InvalidStay {
            check_in: request.check_in_date,
            check_out: request.check_out_date,
        },
    )?;

    Ok((kennel_number, dog_ids, stay))
}

fn validate_booking(request: &BookingRequest) -> Result<Option<StayWindow>, BookingValidationError> {
    if request.duration == Some(0) {
        return Err(BookingValidationError::ZeroDuration);
    }

    match request.service_type {
        ServiceType::Boarding => {
            let end = request
                .end_date
                .ok_or(BookingValidationError::MissingCheckOut)?;
            StayWindow::new(request.start_date, end)
                .map(Some)
                .ok_or(BookingValidationError::InvalidDates {
                    start: request.start_date,
                    end,
                })
        }
        ServiceType::Training | ServiceType::Walking => {
            if request.kennel_number.is_some() {
                return Err(BookingValidationError::KennelWithoutBoarding);
            }
            match request.end_date {
                Some(end) if end < request.start_date => Err(BookingValidationError::InvalidDates {
                    start: request.start_date,
                    end,
                }),
                _ => Ok(None),
            }
        }
    }
}

/// Delete a row and confirm it is gone by looking it up again. Returns
/// `false` when there was nothing to delete.
fn confirm_removed<T>(
    record: &'static str,
    id: u64,
    lookup: impl Fn() -> Result<Option<T>, RepositoryError>,
    delete: impl FnOnce() -> Result<(), RepositoryError>,
) -> Result<bool, BoardingServiceError> {
    if lookup()?.is_none() {
        return Ok(false);
    }
    delete()?;
    if lookup()?.is_some() {
        return Err(BoardingServiceError::DeletionUnconfirmed { record, id });
    }
    Ok(true)
}
