use crate::infra::{build_boarding_service, BoardingApi};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use kennel_desk::boarding::contract::parse_date;
use kennel_desk::boarding::{
    default_price_list, format_amount, BookingRequest, BoardingServiceError, ClientId, DogId,
    KennelAssignment, KennelAssignmentRequest, KennelNumber, PriceListImporter, PriceSource,
    PricingResolver, Quantity, ServiceType, TrainingType,
};
use kennel_desk::config::{BoardingConfig, DEFAULT_KENNEL_COUNT};
use kennel_desk::error::AppError;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Service to price: boarding, training, or walking
    #[arg(long, value_parser = parse_service)]
    pub(crate) service: ServiceType,
    /// Training format: group or 1-on-1
    #[arg(long, value_parser = parse_training_type)]
    pub(crate) training_type: Option<TrainingType>,
    /// Nights, hours, or sessions
    #[arg(long, default_value_t = 1)]
    pub(crate) units: u32,
    /// Dogs sharing the stay (boarding only)
    #[arg(long, default_value_t = 1)]
    pub(crate) dogs: u32,
    /// Price list CSV to quote against instead of the built-in list
    #[arg(long)]
    pub(crate) pricing_csv: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Kennel used for the walkthrough
    #[arg(long, default_value_t = 5)]
    pub(crate) kennel: u32,
    /// First check-in date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) check_in: Option<NaiveDate>,
}

pub(crate) fn parse_service(raw: &str) -> Result<ServiceType, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "boarding" => Ok(ServiceType::Boarding),
        "training" => Ok(ServiceType::Training),
        "walking" | "walk" => Ok(ServiceType::Walking),
        other => Err(format!(
            "unknown service '{other}' (expected boarding, training, or walking)"
        )),
    }
}

pub(crate) fn parse_training_type(raw: &str) -> Result<TrainingType, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "group" => Ok(TrainingType::Group),
        "1-on-1" | "one-on-one" | "one_on_one" | "private" => Ok(TrainingType::OneOnOne),
        other => Err(format!("unknown training type '{other}' (expected group or 1-on-1)")),
    }
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let rows = match &args.pricing_csv {
        Some(path) => PriceListImporter::from_path(path)?,
        None => default_price_list(),
    };
    let resolver = PricingResolver::new(rows);
    let quantity = match args.service {
        ServiceType::Boarding => Quantity::nights_for_dogs(args.units, args.dogs),
        ServiceType::Training | ServiceType::Walking => Quantity::units(args.units),
    };
    let quote = resolver.resolve(args.service, args.training_type, quantity);

    println!("Quote for {}", quote.service_type);
    match quote.service_type {
        ServiceType::Boarding => println!(
            "  Quantity: {} night(s) x {} dog(s)",
            quote.units, quote.dogs
        ),
        ServiceType::Training | ServiceType::Walking => {
            println!("  Quantity: {} unit(s)", quote.units)
        }
    }
    let source = match quote.source {
        PriceSource::PriceList(id) => format!("price list row {id}"),
        PriceSource::Fallback => "fallback rate".to_string(),
        PriceSource::Snapshot => "earlier estimate".to_string(),
    };
    println!("  Unit price: {} ({source})", format_amount(quote.unit_price));
    println!("  Total: {}", format_amount(quote.total));
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = build_boarding_service(&BoardingConfig {
        kennel_count: DEFAULT_KENNEL_COUNT.max(args.kennel),
        dog_roster_csv: None,
        pricing_csv: None,
    })?;
    let kennel = args.kennel;
    let check_in = args
        .check_in
        .unwrap_or_else(|| Local::now().date_naive());
    let day = |offset: i64| check_in + Duration::days(offset);

    println!("Kennel desk demo (kennel {kennel})");
    println!("Household A owns dogs #12, #50, #51; household B owns dog #99.\n");

    println!("1. Dog #12 checks in for four nights");
    let first = service.assign_kennel(assign(kennel, &[12], day(0), day(4)));
    let first_booking = first
        .as_ref()
        .ok()
        .and_then(|assignment| assignment.bookings.first())
        .map(|booking| booking.id);
    report_assignment(first);

    println!("\n2. Dog #99 from another household asks for an overlapping night");
    report_assignment(service.assign_kennel(assign(kennel, &[99], day(2), day(3))));

    println!("\n3. Dog #50 from the same household joins");
    report_assignment(service.assign_kennel(assign(kennel, &[50], day(1), day(3))));
    match service.current_occupants(KennelNumber(kennel), day(2)) {
        Ok(occupants) => println!("  Occupants on {}: {}", day(2), occupants.len()),
        Err(err) => println!("  Occupancy unavailable: {err}"),
    }

    println!("\n4. Dog #51 would be a third dog in the kennel");
    report_assignment(service.assign_kennel(assign(kennel, &[51], day(1), day(3))));

    println!("\n5. Dog #99 books a group training session");
    let training = BookingRequest {
        client_id: ClientId(2),
        dog_id: DogId(99),
        service_type: ServiceType::Training,
        training_type: Some(TrainingType::Group),
        start_date: day(1),
        end_date: None,
        start_time: None,
        end_time: None,
        duration: None,
        kennel_number: None,
        staff_id: None,
    };
    match service.create_booking(training) {
        Ok(confirmation) => match (confirmation.estimate, confirmation.warning) {
            (Some(estimate), _) => println!("  Booked; estimate: {}", estimate.notes),
            (None, Some(warning)) => println!("  Booked; {warning}"),
            (None, None) => println!("  Booked"),
        },
        Err(err) => println!("  Booking refused: {err}"),
    }

    println!("\n6. Dog #12's stay is cancelled");
    match first_booking {
        Some(booking_id) => report_cancellation(&service, booking_id),
        None => println!("  Nothing to cancel"),
    }

    Ok(())
}

fn assign(kennel: u32, dogs: &[u64], check_in: NaiveDate, check_out: NaiveDate) -> KennelAssignmentRequest {
    KennelAssignmentRequest {
        kennel_ids: vec![KennelNumber(kennel)],
        dog_ids: dogs.iter().copied().map(DogId).collect(),
        check_in_date: check_in,
        check_out_date: check_out,
    }
}

fn report_assignment(result: Result<KennelAssignment, BoardingServiceError>) {
    match result {
        Ok(assignment) => {
            println!(
                "  Assigned to kennel {} ({} booking(s))",
                assignment.kennel.number,
                assignment.bookings.len()
            );
            for estimate in &assignment.estimates {
                println!("  Estimate #{}: {}", estimate.id, estimate.notes);
            }
            for warning in &assignment.warnings {
                println!("  Warning: {warning}");
            }
        }
        Err(err) => println!("  Refused: {err}"),
    }
}

fn report_cancellation(service: &BoardingApi, booking_id: kennel_desk::boarding::BookingId) {
    match service.cancel_booking(booking_id) {
        Ok(report) => {
            println!(
                "  Booking {} removed with {} estimate(s) and {} invoice(s)",
                report.booking_id, report.estimates_removed, report.invoices_removed
            );
            match service.estimates_for_client(ClientId(1)) {
                Ok(estimates) => {
                    let dangling = estimates
                        .iter()
                        .filter(|estimate| estimate.booking_id == Some(booking_id))
                        .count();
                    println!("  Estimates still pointing at the booking: {dangling}");
                }
                Err(err) => println!("  Estimates unavailable: {err}"),
            }
        }
        Err(err) => println!("  Cancellation failed: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_and_training_names() {
        assert_eq!(parse_service(" Walking "), Ok(ServiceType::Walking));
        assert!(parse_service("grooming").is_err());
        assert_eq!(parse_training_type("1-on-1"), Ok(TrainingType::OneOnOne));
        assert_eq!(parse_training_type("group"), Ok(TrainingType::Group));
    }

    #[test]
    fn demo_runs_against_the_sample_roster() {
        let args = DemoArgs {
            kennel: 5,
            check_in: NaiveDate::from_ymd_opt(2025, 1, 1),
        };
        run_demo(args).expect("demo completes");
    }

    #[test]
    fn quote_uses_the_built_in_price_list() {
        let args = QuoteArgs {
            service: ServiceType::Boarding,
            training_type: None,
            units: 4,
            dogs: 2,
            pricing_csv: None,
        };
        run_quote(args).expect("quote prints");
    }
}
