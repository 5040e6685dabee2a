//! Dog boarding core: kennel availability, assignment, pricing, estimates,
//! and the cancellation cascade.
//!
//! Bookings are the only record of who sits in which kennel; a kennel row
//! carries nothing but its number and housekeeping status.

pub mod availability;
pub mod contract;
pub mod domain;
pub mod estimate;
pub mod invoice;
pub mod memory;
pub mod pricing;
pub mod repository;
pub mod roster;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use availability::{
    evaluate_assignment, AssignmentCheck, AssignmentRejection, AvailabilityChecker, Occupant,
};
pub use contract::{
    BookingRequest, CancelBookingRequest, CancelEstimateRequest, ConvertEstimateRequest,
    DiscountRequest, KennelAssignmentRequest, KennelBookingsQuery, KennelStatusRequest,
    PaymentRequest,
};
pub use domain::{
    Booking, BookingId, BookingStatus, ClientId, Dog, DogId, Estimate, EstimateId,
    EstimateStatus, Invoice, InvoiceId, Kennel, KennelNumber, KennelStatus, NewBooking,
    PaymentStatus, PricingDraft, PricingId, PricingUnit, ServicePricing, ServiceType, StaffId,
    StayWindow, TrainingType, UnitType, KENNEL_CAPACITY,
};
pub use estimate::{billable_units, draft_estimate, EstimateError, EstimateGenerator};
pub use invoice::{InvoiceError, DEFAULT_PAYMENT_TERMS_DAYS};
pub use memory::{InMemoryBoardingStore, InMemoryPricingCatalog};
pub use pricing::{
    default_price_list, format_amount, to_major_units, PriceQuote, PriceSource, PricingResolver,
    Quantity,
};
pub use repository::{
    BoardingStore, BookingRepository, KennelRepository, LedgerRepository, PricingCatalog,
    RepositoryError,
};
pub use roster::{sample_roster, DogRosterImporter, PriceListImporter, RosterImportError};
pub use router::boarding_router;
pub use service::{
    BoardingService, BoardingServiceError, BookingConfirmation, BookingValidationError,
    CancellationReport, KennelAssignment, KennelOccupancy, KennelRelease, MissingRecord,
};
