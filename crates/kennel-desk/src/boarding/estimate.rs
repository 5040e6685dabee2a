use std::sync::Arc;

use super::domain::{
    Booking, BookingId, DogId, Estimate, EstimateStatus, NewEstimate, ServiceType, TrainingType,
    UnitType,
};
use super::pricing::{format_amount, PriceQuote, PriceSource, PricingResolver, Quantity};
use super::repository::{LedgerRepository, PricingCatalog, RepositoryError};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, thiserror::Error)]
pub enum EstimateError {
    #[error("no bookings supplied for the estimate")]
    NoBookings,
    #[error("boarding booking {0} has no check-out date")]
    MissingCheckOut(BookingId),
    #[error("booking {booking} has no billable {unit}s")]
    NoBillableUnits {
        booking: BookingId,
        unit: &'static str,
    },
    #[error("bookings for one estimate must share a client and service")]
    MixedBookings,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Quantity an estimate bills for a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillableUnits {
    pub units: u32,
    pub unit_type: UnitType,
}

/// Nights for boarding (partial days round up), hours for training and
/// sessions for walking, the latter two defaulting to one.
pub fn billable_units(booking: &Booking) -> Result<BillableUnits, EstimateError> {
    let (units, unit_type) = match booking.service_type {
        ServiceType::Boarding => {
            let end_date = booking
                .end_date
                .ok_or(EstimateError::MissingCheckOut(booking.id))?;
            let seconds = match (booking.start_time, booking.end_time) {
                (Some(start), Some(end)) => {
                    (end_date.and_time(end) - booking.start_date.and_time(start)).num_seconds()
                }
                _ => (end_date - booking.start_date).num_days() * SECONDS_PER_DAY,
            };
            let nights = (seconds + SECONDS_PER_DAY - 1).div_euclid(SECONDS_PER_DAY);
            (nights, UnitType::Nights)
        }
        ServiceType::Training => (i64::from(booking.duration.unwrap_or(1)), UnitType::Hours),
        ServiceType::Walking => (i64::from(booking.duration.unwrap_or(1)), UnitType::Sessions),
    };

    match u32::try_from(units) {
        Ok(units) if units > 0 => Ok(BillableUnits { units, unit_type }),
        _ => Err(EstimateError::NoBillableUnits {
            booking: booking.id,
            unit: unit_type.singular(),
        }),
    }
}

/// Price a group of bookings made together for one client (one booking per
/// dog, same dates and service) into a pending estimate.
pub fn draft_estimate(
    bookings: &[Booking],
    resolver: &PricingResolver,
) -> Result<NewEstimate, EstimateError> {
    let anchor = bookings.first().ok_or(EstimateError::NoBookings)?;
    if bookings.iter().any(|booking| {
        booking.client_id != anchor.client_id || booking.service_type != anchor.service_type
    }) {
        return Err(EstimateError::MixedBookings);
    }

    let billable = billable_units(anchor)?;
    let dog_ids: Vec<_> = bookings.iter().map(|booking| booking.dog_id).collect();
    let dogs = u32::try_from(dog_ids.len()).unwrap_or(u32::MAX);
    let quantity = match anchor.service_type {
        ServiceType::Boarding => Quantity::nights_for_dogs(billable.units, dogs),
        ServiceType::Training | ServiceType::Walking => Quantity::units(billable.units),
    };
    let quote = resolver.resolve(anchor.service_type, anchor.training_type, quantity);

    Ok(NewEstimate {
        booking_id: Some(anchor.id),
        client_id: anchor.client_id,
        dog_ids,
        service_type: anchor.service_type,
        check_in_date: anchor.start_date,
        check_out_date: anchor.end_date,
        units: billable.units,
        unit_type: billable.unit_type,
        unit_price: quote.unit_price,
        total_amount: quote.total,
        status: EstimateStatus::Pending,
        notes: describe(anchor.training_type, billable, &quote),
    })
}

/// Re-bill a shared estimate for the bookings still standing after one dog
/// leaves the stay. The price snapshot and id are kept and the first
/// remaining booking becomes the anchor. `None` when nothing remains.
pub fn regroup_estimate(estimate: &Estimate, remaining: &[Booking]) -> Option<Estimate> {
    let anchor = remaining.first()?;
    let billable = BillableUnits {
        units: estimate.units,
        unit_type: estimate.unit_type,
    };
    let dog_ids: Vec<DogId> = remaining.iter().map(|booking| booking.dog_id).collect();
    let dogs = match estimate.service_type {
        ServiceType::Boarding => u32::try_from(dog_ids.len()).unwrap_or(u32::MAX),
        ServiceType::Training | ServiceType::Walking => 1,
    };
    let quote = PriceQuote {
        service_type: estimate.service_type,
        unit_price: estimate.unit_price,
        units: estimate.units,
        dogs,
        total: estimate
            .unit_price
            .saturating_mul(i64::from(estimate.units))
            .saturating_mul(i64::from(dogs)),
        source: PriceSource::Snapshot,
    };

    Some(Estimate {
        booking_id: Some(anchor.id),
        dog_ids,
        total_amount: quote.total,
        notes: describe(anchor.training_type, billable, &quote),
        ..estimate.clone()
    })
}

fn describe(
    training_type: Option<TrainingType>,
    billable: BillableUnits,
    quote: &PriceQuote,
) -> String {
    let service = match (quote.service_type, training_type) {
        (ServiceType::Training, Some(TrainingType::Group)) => "Group training".to_string(),
        (ServiceType::Training, Some(TrainingType::OneOnOne)) => "1-on-1 training".to_string(),
        (service, _) => {
            let label = service.label();
            let mut chars = label.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    };
    let unit = billable.unit_type.singular();
    let plural = |count: u32, word: &str| {
        if count == 1 {
            format!("{count} {word}")
        } else {
            format!("{count} {word}s")
        }
    };

    let mut notes = format!("{service}: {}", plural(billable.units, unit));
    if quote.service_type == ServiceType::Boarding {
        notes.push_str(&format!(" x {}", plural(quote.dogs, "dog")));
    }
    notes.push_str(&format!(
        " at {} per {unit} = {}",
        format_amount(quote.unit_price),
        format_amount(quote.total)
    ));
    notes
}

/// Prices bookings against the live price list and stores the estimate.
pub struct EstimateGenerator<S: ?Sized, P: ?Sized> {
    store: Arc<S>,
    catalog: Arc<P>,
}

impl<S, P> EstimateGenerator<S, P>
where
    S: LedgerRepository + ?Sized,
    P: PricingCatalog + ?Sized,
{
    pub fn new(store: Arc<S>, catalog: Arc<P>) -> Self {
        Self { store, catalog }
    }

    pub fn generate(&self, bookings: &[Booking]) -> Result<Estimate, EstimateError> {
        let resolver = PricingResolver::new(self.catalog.active_pricing()?);
        let draft = draft_estimate(bookings, &resolver)?;
        Ok(self.store.insert_estimate(draft)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boarding::domain::{BookingStatus, ClientId, EstimateId, KennelNumber};
    use chrono::{NaiveDate, NaiveTime};

    fn boarding(id: u64, dog: u64, start: u32, end: u32) -> Booking {
        Booking {
            id: BookingId(id),
            client_id: ClientId(1),
            dog_id: DogId(dog),
            service_type: ServiceType::Boarding,
            training_type: None,
            start_date: NaiveDate::from_ymd_opt(2025, 1, start).expect("valid"),
            end_date: Some(NaiveDate::from_ymd_opt(2025, 1, end).expect("valid")),
            start_time: None,
            end_time: None,
            duration: None,
            kennel_number: Some(KennelNumber(5)),
            staff_id: None,
            status: BookingStatus::Confirmed,
        }
    }

    #[test]
    fn boarding_counts_calendar_nights() {
        let units = billable_units(&boarding(1, 12, 1, 5)).expect("billable");
        assert_eq!(units.units, 4);
        assert_eq!(units.unit_type, UnitType::Nights);
    }

    #[test]
    fn boarding_rounds_partial_days_up() {
        let mut booking = boarding(1, 12, 1, 5);
        booking.start_time = NaiveTime::from_hms_opt(10, 0, 0);
        booking.end_time = NaiveTime::from_hms_opt(14, 30, 0);
        assert_eq!(billable_units(&booking).expect("billable").units, 5);
    }

    #[test]
    fn walking_defaults_to_one_session() {
        let mut booking = boarding(1, 12, 1, 5);
        booking.service_type = ServiceType::Walking;
        booking.end_date = None;
        let units = billable_units(&booking).expect("billable");
        assert_eq!(units.units, 1);
        assert_eq!(units.unit_type, UnitType::Sessions);
    }

    #[test]
    fn boarding_without_check_out_is_not_billable() {
        let mut booking = boarding(9, 12, 1, 5);
        booking.end_date = None;
        assert!(matches!(
            billable_units(&booking),
            Err(EstimateError::MissingCheckOut(BookingId(9)))
        ));
    }

    #[test]
    fn draft_prices_every_dog_in_the_group() {
        let resolver = PricingResolver::new(Vec::new());
        let bookings = vec![boarding(1, 12, 1, 5), boarding(2, 50, 1, 5)];
        let draft = draft_estimate(&bookings, &resolver).expect("draft builds");

        assert_eq!(draft.booking_id, Some(BookingId(1)));
        assert_eq!(draft.dog_ids, vec![DogId(12), DogId(50)]);
        assert_eq!(draft.units, 4);
        assert_eq!(draft.unit_price, 4000);
        assert_eq!(draft.total_amount, 32000);
        assert_eq!(draft.status, EstimateStatus::Pending);
        assert_eq!(
            draft.notes,
            "Boarding: 4 nights x 2 dogs at £40.00 per night = £320.00"
        );
    }

    #[test]
    fn regrouping_keeps_the_snapshot_price_for_the_remaining_dog() {
        let resolver = PricingResolver::new(Vec::new());
        let bookings = vec![boarding(1, 12, 1, 5), boarding(2, 50, 1, 5)];
        let shared = draft_estimate(&bookings, &resolver)
            .expect("draft builds")
            .into_estimate(EstimateId(7));
        let shared = Estimate {
            unit_price: 3500,
            ..shared
        };

        let regrouped =
            regroup_estimate(&shared, &bookings[1..]).expect("one booking remains");

        assert_eq!(regrouped.id, EstimateId(7));
        assert_eq!(regrouped.booking_id, Some(BookingId(2)));
        assert_eq!(regrouped.dog_ids, vec![DogId(50)]);
        assert_eq!(regrouped.units, 4);
        assert_eq!(regrouped.unit_price, 3500);
        assert_eq!(regrouped.total_amount, 14000);
        assert_eq!(
            regrouped.notes,
            "Boarding: 4 nights x 1 dog at £35.00 per night = £140.00"
        );
        assert!(regroup_estimate(&shared, &[]).is_none());
    }

    #[test]
    fn draft_rejects_mixed_clients() {
        let resolver = PricingResolver::new(Vec::new());
        let mut other = boarding(2, 99, 1, 5);
        other.client_id = ClientId(2);
        let bookings = vec![boarding(1, 12, 1, 5), other];
        assert!(matches!(
            draft_estimate(&bookings, &resolver),
            Err(EstimateError::MixedBookings)
        ));
    }
}
