use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::Local;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::contract::{
    BookingRequest, CancelBookingRequest, CancelEstimateRequest, ConvertEstimateRequest,
    DiscountRequest, KennelAssignmentRequest, KennelBookingsQuery, KennelStatusRequest,
    PaymentRequest,
};
use super::domain::{Booking, ClientId, EstimateId, InvoiceId, KennelNumber, PricingDraft, PricingId};
use super::pricing::to_major_units;
use super::repository::{BoardingStore, PricingCatalog};
use super::service::{BoardingService, BoardingServiceError};

type SharedService<S, P> = State<Arc<BoardingService<S, P>>>;

/// Router exposing kennel assignment, bookings, cancellation, and billing.
pub fn boarding_router<S, P>(service: Arc<BoardingService<S, P>>) -> Router
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    Router::new()
        .route("/api/kennels/assign", post(assign_handler::<S, P>))
        .route(
            "/api/kennels/check-availability",
            post(check_availability_handler::<S, P>),
        )
        .route("/api/kennels/:kennel/unassign", patch(unassign_handler::<S, P>))
        .route("/api/kennels/:kennel/status", patch(kennel_status_handler::<S, P>))
        .route("/api/kennels/:kennel/occupants", get(occupants_handler::<S, P>))
        .route(
            "/api/kennels-with-bookings",
            get(kennels_with_bookings_handler::<S, P>),
        )
        .route("/api/bookings", post(create_booking_handler::<S, P>))
        .route("/api/cancel-booking", post(cancel_booking_handler::<S, P>))
        .route("/api/cancel-estimate", post(cancel_estimate_handler::<S, P>))
        .route(
            "/api/estimates/:estimate/convert",
            post(convert_estimate_handler::<S, P>),
        )
        .route(
            "/api/invoices/:invoice/discount",
            patch(discount_handler::<S, P>),
        )
        .route("/api/invoices/:invoice/payment", patch(payment_handler::<S, P>))
        .route(
            "/api/clients/:client/estimates",
            get(client_estimates_handler::<S, P>),
        )
        .route(
            "/api/service-pricing",
            get(price_list_handler::<S, P>).put(upsert_price_handler::<S, P>),
        )
        .route(
            "/api/service-pricing/:pricing",
            delete(deactivate_price_handler::<S, P>),
        )
        .with_state(service)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookingResponse {
    #[serde(flatten)]
    booking: Booking,
    #[serde(skip_serializing_if = "Option::is_none")]
    estimate_id: Option<EstimateId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    estimate_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

pub(crate) async fn assign_handler<S, P>(
    State(service): SharedService<S, P>,
    payload: Result<Json<KennelAssignmentRequest>, JsonRejection>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.assign_kennel(request) {
        Ok(assignment) => {
            let payload = json!({
                "message": format!("Dog(s) assigned to kennel {}", assignment.kennel.number),
                "kennel": assignment.kennel,
                "bookings": assignment.bookings,
                "estimates": assignment.estimates,
                "supersededBookings": assignment.superseded_bookings,
                "warnings": assignment.warnings,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn check_availability_handler<S, P>(
    State(service): SharedService<S, P>,
    payload: Result<Json<KennelAssignmentRequest>, JsonRejection>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.check_assignment(&request) {
        Ok(check) => (StatusCode::OK, Json(check)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn unassign_handler<S, P>(
    State(service): SharedService<S, P>,
    Path(kennel): Path<KennelNumber>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    match service.unassign_kennel(kennel) {
        Ok(release) => {
            let payload = json!({
                "message": format!("Kennel {kennel} unassigned"),
                "kennel": release.kennel,
                "detachedBookings": release.detached_bookings,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn kennel_status_handler<S, P>(
    State(service): SharedService<S, P>,
    Path(kennel): Path<KennelNumber>,
    payload: Result<Json<KennelStatusRequest>, JsonRejection>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.set_kennel_status(kennel, request.status) {
        Ok(kennel) => (StatusCode::OK, Json(kennel)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn occupants_handler<S, P>(
    State(service): SharedService<S, P>,
    Path(kennel): Path<KennelNumber>,
    Query(query): Query<KennelBookingsQuery>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    let on = query.on.unwrap_or_else(|| Local::now().date_naive());
    match service.current_occupants(kennel, on) {
        Ok(bookings) => (StatusCode::OK, Json(bookings)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn kennels_with_bookings_handler<S, P>(
    State(service): SharedService<S, P>,
    Query(query): Query<KennelBookingsQuery>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    match service.kennels_with_bookings(query.on) {
        Ok(kennels) => (StatusCode::OK, Json(kennels)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_booking_handler<S, P>(
    State(service): SharedService<S, P>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.create_booking(request) {
        Ok(confirmation) => {
            let body = BookingResponse {
                estimate_id: confirmation.estimate.as_ref().map(|estimate| estimate.id),
                estimate_total: confirmation
                    .estimate
                    .as_ref()
                    .map(|estimate| to_major_units(estimate.total_amount)),
                warning: confirmation.warning,
                booking: confirmation.booking,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn cancel_booking_handler<S, P>(
    State(service): SharedService<S, P>,
    payload: Result<Json<CancelBookingRequest>, JsonRejection>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            let payload = json!({ "success": false, "error": rejection.body_text() });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    match service.cancel_booking(request.booking_id) {
        Ok(report) => {
            let payload = json!({
                "message": "Booking and associated records cancelled successfully",
                "success": true,
                "estimatesRemoved": report.estimates_removed,
                "estimatesRevised": report.estimates_revised,
                "invoicesRemoved": report.invoices_removed,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(BoardingServiceError::NotFound(missing)) => {
            let payload = json!({ "success": false, "error": format!("{missing} not found") });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(err) => {
            error!(booking = %request.booking_id, error = %err, "booking cancellation failed");
            let payload = json!({ "success": false, "error": "Failed to cancel booking" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn cancel_estimate_handler<S, P>(
    State(service): SharedService<S, P>,
    payload: Result<Json<CancelEstimateRequest>, JsonRejection>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.cancel_estimate(request.estimate_id) {
        Ok(()) => {
            let payload = json!({
                "message": "Estimate cancelled successfully",
                "success": true,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn convert_estimate_handler<S, P>(
    State(service): SharedService<S, P>,
    Path(estimate): Path<EstimateId>,
    payload: Result<Json<ConvertEstimateRequest>, JsonRejection>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    let request = match payload {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => ConvertEstimateRequest::default(),
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let issue_date = request
        .issue_date
        .unwrap_or_else(|| Local::now().date_naive());

    match service.convert_estimate(estimate, issue_date, request.due_in_days) {
        Ok(invoice) => (StatusCode::OK, Json(invoice)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn discount_handler<S, P>(
    State(service): SharedService<S, P>,
    Path(invoice): Path<InvoiceId>,
    payload: Result<Json<DiscountRequest>, JsonRejection>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.apply_discount(invoice, request) {
        Ok(invoice) => (StatusCode::OK, Json(invoice)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn payment_handler<S, P>(
    State(service): SharedService<S, P>,
    Path(invoice): Path<InvoiceId>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.record_payment(invoice, request.payment_status) {
        Ok(invoice) => (StatusCode::OK, Json(invoice)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn client_estimates_handler<S, P>(
    State(service): SharedService<S, P>,
    Path(client): Path<ClientId>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    match service.estimates_for_client(client) {
        Ok(estimates) => (StatusCode::OK, Json(estimates)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn price_list_handler<S, P>(State(service): SharedService<S, P>) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    match service.price_list() {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn upsert_price_handler<S, P>(
    State(service): SharedService<S, P>,
    payload: Result<Json<PricingDraft>, JsonRejection>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    let Json(draft) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.upsert_price(draft) {
        Ok(row) => (StatusCode::OK, Json(row)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn deactivate_price_handler<S, P>(
    State(service): SharedService<S, P>,
    Path(pricing): Path<PricingId>,
) -> Response
where
    S: BoardingStore + 'static,
    P: PricingCatalog + 'static,
{
    match service.deactivate_price(pricing) {
        Ok(row) => (StatusCode::OK, Json(row)).into_response(),
        Err(err) => error_response(err),
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

/// Validation and conflicts are 400s, missing rows 404s. Store failures
/// become a generic 500 and are only detailed in the log.
fn error_response(err: BoardingServiceError) -> Response {
    let status = match &err {
        BoardingServiceError::Rejected(_)
        | BoardingServiceError::Invalid(_)
        | BoardingServiceError::Invoice(_) => StatusCode::BAD_REQUEST,
        BoardingServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        BoardingServiceError::DeletionUnconfirmed { .. }
        | BoardingServiceError::Repository(_) => {
            error!(error = %err, "boarding request failed");
            let payload = json!({ "error": "Internal server error" });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response();
        }
    };

    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
