//! Kennel availability rules: capacity, household sharing, and sequential reuse.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{ClientId, Dog, DogId, KennelNumber, StayWindow, KENNEL_CAPACITY};
use super::repository::{BookingRepository, KennelRepository, RepositoryError};

/// Reasons an assignment is refused. All map to HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentRejection {
    #[error("At least one dog must be selected")]
    NoDogs,
    #[error("Maximum 2 dogs per kennel")]
    TooManyDogs { requested: usize },
    #[error("Dogs from different households cannot share a kennel (clients #{first} and #{second})")]
    MixedHouseholds { first: ClientId, second: ClientId },
    #[error("Please assign one kennel at a time")]
    MultipleKennels { requested: usize },
    #[error("Check-out date ({check_out}) must be after check-in date ({check_in})")]
    InvalidStay {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    #[error(
        "Kennel {kennel} is occupied by dog #{blocking_dog} until {until}; \
         dogs from different households cannot share a kennel on overlapping dates"
    )]
    HouseholdConflict {
        kennel: KennelNumber,
        blocking_dog: DogId,
        until: NaiveDate,
    },
    #[error("Cannot exceed 2 dogs per kennel for overlapping dates.")]
    CapacityExceeded { kennel: KennelNumber },
}

impl AssignmentRejection {
    /// Conflicts stem from existing occupants; everything else is bad input.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AssignmentRejection::HouseholdConflict { .. }
                | AssignmentRejection::CapacityExceeded { .. }
        )
    }
}

/// Outcome of an availability check, shaped for API consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentCheck {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<Result<(), AssignmentRejection>> for AssignmentCheck {
    fn from(result: Result<(), AssignmentRejection>) -> Self {
        match result {
            Ok(()) => Self {
                allowed: true,
                reason: None,
            },
            Err(rejection) => Self {
                allowed: false,
                reason: Some(rejection.to_string()),
            },
        }
    }
}

/// A dog currently booked into a kennel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupant {
    pub dog_id: DogId,
    pub client_id: ClientId,
    pub stay: StayWindow,
}

/// Apply the kennel rules to a proposed stay.
///
/// Dogs placed together always overlap each other, so they must come from
/// one household. An empty kennel, or one whose occupants never overlap the
/// proposed stay, then accepts that household: kennels are reused
/// sequentially. When stays do overlap, every overlapping occupant must
/// belong to the same client as every proposed dog, and the combined
/// headcount may not exceed [`KENNEL_CAPACITY`].
pub fn evaluate_assignment(
    kennel: KennelNumber,
    occupants: &[Occupant],
    proposed: &[Dog],
    stay: StayWindow,
) -> Result<(), AssignmentRejection> {
    if proposed.is_empty() {
        return Err(AssignmentRejection::NoDogs);
    }
    if proposed.len() > KENNEL_CAPACITY {
        return Err(AssignmentRejection::TooManyDogs {
            requested: proposed.len(),
        });
    }

    if let Some((first, second)) = proposed
        .iter()
        .find(|dog| dog.client_id != proposed[0].client_id)
        .map(|dog| (proposed[0].client_id, dog.client_id))
    {
        return Err(AssignmentRejection::MixedHouseholds { first, second });
    }

    let proposed_ids: BTreeSet<DogId> = proposed.iter().map(|dog| dog.id).collect();
    let overlapping: Vec<&Occupant> = occupants
        .iter()
        .filter(|occupant| !proposed_ids.contains(&occupant.dog_id))
        .filter(|occupant| occupant.stay.overlaps(&stay))
        .collect();

    if overlapping.is_empty() {
        return Ok(());
    }

    for occupant in &overlapping {
        if proposed.iter().any(|dog| dog.client_id != occupant.client_id) {
            return Err(AssignmentRejection::HouseholdConflict {
                kennel,
                blocking_dog: occupant.dog_id,
                until: occupant.stay.check_out(),
            });
        }
    }

    let resident_dogs: BTreeSet<DogId> = overlapping
        .iter()
        .map(|occupant| occupant.dog_id)
        .collect();
    if resident_dogs.len() + proposed_ids.len() > KENNEL_CAPACITY {
        return Err(AssignmentRejection::CapacityExceeded { kennel });
    }

    Ok(())
}

/// Loads derived occupancy from bookings and evaluates proposed stays.
pub struct AvailabilityChecker<S: ?Sized> {
    store: Arc<S>,
}

impl<S> AvailabilityChecker<S>
where
    S: KennelRepository + BookingRepository + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Dogs holding active boarding bookings in the kennel, in booking order.
    pub fn occupants(&self, kennel: KennelNumber) -> Result<Vec<Occupant>, RepositoryError> {
        let mut bookings = self.store.bookings_for_kennel(kennel)?;
        bookings.sort_by_key(|booking| booking.id);

        Ok(bookings
            .into_iter()
            .filter(|booking| booking.occupies(kennel))
            .filter_map(|booking| {
                booking.stay().map(|stay| Occupant {
                    dog_id: booking.dog_id,
                    client_id: booking.client_id,
                    stay,
                })
            })
            .collect())
    }

    pub fn check(
        &self,
        kennel: KennelNumber,
        proposed: &[Dog],
        stay: StayWindow,
    ) -> Result<Result<(), AssignmentRejection>, RepositoryError> {
        let occupants = self.occupants(kennel)?;
        Ok(evaluate_assignment(kennel, &occupants, proposed, stay))
    }
}
