use std::fmt;

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Most dogs a kennel may hold across overlapping stays.
pub const KENNEL_CAPACITY: usize = 2;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Owner of one or more dogs.
    ClientId(u64)
);
record_id!(DogId(u64));
record_id!(
    /// Physical kennel number within the fixed pool (1..=N).
    KennelNumber(u32)
);
record_id!(BookingId(u64));
record_id!(EstimateId(u64));
record_id!(InvoiceId(u64));
record_id!(PricingId(u64));
record_id!(StaffId(u64));

/// Dog profile; only ever read by the boarding rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dog {
    pub id: DogId,
    pub client_id: ClientId,
    pub name: String,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub care_instructions: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KennelStatus {
    Available,
    Occupied,
    Cleaning,
}

impl KennelStatus {
    pub const fn label(self) -> &'static str {
        match self {
            KennelStatus::Available => "available",
            KennelStatus::Occupied => "occupied",
            KennelStatus::Cleaning => "cleaning",
        }
    }
}

/// Kennel row. Occupants are not stored here; they are derived from active
/// boarding bookings carrying this kennel number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kennel {
    pub number: KennelNumber,
    pub status: KennelStatus,
}

impl Kennel {
    pub fn available(number: KennelNumber) -> Self {
        Self {
            number,
            status: KennelStatus::Available,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Boarding,
    Training,
    Walking,
}

impl ServiceType {
    pub const fn label(self) -> &'static str {
        match self {
            ServiceType::Boarding => "boarding",
            ServiceType::Training => "training",
            ServiceType::Walking => "walking",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingType {
    #[serde(rename = "1-on-1", alias = "one_on_one", alias = "private")]
    OneOnOne,
    #[serde(rename = "group")]
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Whether the booking still holds its slot (kennel, staff time, billing).
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::InProgress
        )
    }

    pub const fn label(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

/// Half-open stay `[check_in, check_out)` measured in calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayWindow {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayWindow {
    /// Returns `None` unless check-out falls strictly after check-in.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Option<Self> {
        (check_out > check_in).then_some(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn overlaps(&self, other: &StayWindow) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    pub fn covers(&self, day: NaiveDate) -> bool {
        self.check_in <= day && day < self.check_out
    }
}

/// One dog's reservation for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub client_id: ClientId,
    pub dog_id: DogId,
    pub service_type: ServiceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_type: Option<TrainingType>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub duration: Option<u32>,
    pub kennel_number: Option<KennelNumber>,
    pub staff_id: Option<StaffId>,
    pub status: BookingStatus,
}

impl Booking {
    /// Calendar span a boarding booking blocks in its kennel. A missing end
    /// date blocks the start day only.
    pub fn stay(&self) -> Option<StayWindow> {
        if self.service_type != ServiceType::Boarding {
            return None;
        }
        let check_out = self
            .end_date
            .unwrap_or_else(|| self.start_date + Duration::days(1));
        StayWindow::new(self.start_date, check_out)
    }

    pub fn occupies(&self, kennel: KennelNumber) -> bool {
        self.status.is_active()
            && self.service_type == ServiceType::Boarding
            && self.kennel_number == Some(kennel)
    }
}

/// Booking fields supplied before the store assigns an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub client_id: ClientId,
    pub dog_id: DogId,
    pub service_type: ServiceType,
    pub training_type: Option<TrainingType>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub duration: Option<u32>,
    pub kennel_number: Option<KennelNumber>,
    pub staff_id: Option<StaffId>,
    pub status: BookingStatus,
}

impl NewBooking {
    pub fn into_booking(self, id: BookingId) -> Booking {
        Booking {
            id,
            client_id: self.client_id,
            dog_id: self.dog_id,
            service_type: self.service_type,
            training_type: self.training_type,
            start_date: self.start_date,
            end_date: self.end_date,
            start_time: self.start_time,
            end_time: self.end_time,
            duration: self.duration,
            kennel_number: self.kennel_number,
            staff_id: self.staff_id,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStatus {
    Pending,
    Approved,
    ConvertedToInvoice,
    Cancelled,
}

impl EstimateStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EstimateStatus::Pending => "pending",
            EstimateStatus::Approved => "approved",
            EstimateStatus::ConvertedToInvoice => "converted_to_invoice",
            EstimateStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Nights,
    Hours,
    Sessions,
}

impl UnitType {
    pub const fn singular(self) -> &'static str {
        match self {
            UnitType::Nights => "night",
            UnitType::Hours => "hour",
            UnitType::Sessions => "session",
        }
    }
}

/// Priced quote. Amounts are minor currency units captured at creation and
/// never recomputed from the price list afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub id: EstimateId,
    pub booking_id: Option<BookingId>,
    pub client_id: ClientId,
    pub dog_ids: Vec<DogId>,
    pub service_type: ServiceType,
    pub check_in_date: NaiveDate,
    pub check_out_date: Option<NaiveDate>,
    pub units: u32,
    pub unit_type: UnitType,
    pub unit_price: i64,
    pub total_amount: i64,
    pub status: EstimateStatus,
    pub notes: String,
}

impl Estimate {
    pub fn nights(&self) -> Option<u32> {
        (self.unit_type == UnitType::Nights).then_some(self.units)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEstimate {
    pub booking_id: Option<BookingId>,
    pub client_id: ClientId,
    pub dog_ids: Vec<DogId>,
    pub service_type: ServiceType,
    pub check_in_date: NaiveDate,
    pub check_out_date: Option<NaiveDate>,
    pub units: u32,
    pub unit_type: UnitType,
    pub unit_price: i64,
    pub total_amount: i64,
    pub status: EstimateStatus,
    pub notes: String,
}

impl NewEstimate {
    pub fn into_estimate(self, id: EstimateId) -> Estimate {
        Estimate {
            id,
            booking_id: self.booking_id,
            client_id: self.client_id,
            dog_ids: self.dog_ids,
            service_type: self.service_type,
            check_in_date: self.check_in_date,
            check_out_date: self.check_out_date,
            units: self.units,
            unit_type: self.unit_type,
            unit_price: self.unit_price,
            total_amount: self.total_amount,
            status: self.status,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    PartiallyPaid,
}

/// Billable document. `final_amount` is kept equal to
/// `amount - discount_amount` and never drops below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: InvoiceId,
    pub estimate_id: Option<EstimateId>,
    pub booking_id: Option<BookingId>,
    pub client_id: ClientId,
    pub amount: i64,
    pub discount_amount: i64,
    pub discount_reason: Option<String>,
    pub final_amount: i64,
    pub payment_status: PaymentStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub estimate_id: Option<EstimateId>,
    pub booking_id: Option<BookingId>,
    pub client_id: ClientId,
    pub amount: i64,
    pub discount_amount: i64,
    pub discount_reason: Option<String>,
    pub final_amount: i64,
    pub payment_status: PaymentStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl NewInvoice {
    pub fn into_invoice(self, id: InvoiceId) -> Invoice {
        Invoice {
            id,
            estimate_id: self.estimate_id,
            booking_id: self.booking_id,
            client_id: self.client_id,
            amount: self.amount,
            discount_amount: self.discount_amount,
            discount_reason: self.discount_reason,
            final_amount: self.final_amount,
            payment_status: self.payment_status,
            issue_date: self.issue_date,
            due_date: self.due_date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingUnit {
    PerNight,
    PerSession,
    PerWalk,
    PerHour,
}

/// Price list row. `price_per_unit` is stored in major currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePricing {
    pub id: PricingId,
    pub service_type: ServiceType,
    pub service_name: String,
    pub price_per_unit: u32,
    pub unit: PricingUnit,
    pub is_active: bool,
}

impl ServicePricing {
    /// The only place major units become minor units.
    pub fn unit_price_minor(&self) -> i64 {
        i64::from(self.price_per_unit) * 100
    }
}

/// Price list row as submitted by an administrator; a missing id inserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingDraft {
    #[serde(default)]
    pub id: Option<PricingId>,
    pub service_type: ServiceType,
    pub service_name: String,
    pub price_per_unit: u32,
    pub unit: PricingUnit,
}
