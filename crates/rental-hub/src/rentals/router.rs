use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    BookingId, ComplaintId, IdentityId, ImageId, ListingDraft, ListingId, NotificationId, Role,
};
use super::error::RentalError;
use super::lifecycle::{BookingStatus, ComplaintStatus};
use super::notifications::NotificationSink;
use super::repository::{BlobError, RentalRepository, RepositoryError};
use super::service::{ListingQuery, RentalService};

/// Header carrying the identity established by the upstream session layer.
pub const IDENTITY_HEADER: &str = "x-identity-id";

type SharedService<R, N> = Arc<RentalService<R, N>>;

/// The authenticated principal for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentIdentity(pub IdentityId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(|id| CurrentIdentity(IdentityId(id)))
            .ok_or_else(|| {
                let payload = json!({
                    "error": format!("missing or invalid {IDENTITY_HEADER} header"),
                });
                (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
            })
    }
}

/// JSON body whose rejections use the API error shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RentalError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(request, state)
            .await
            .map(|Json(value)| JsonBody(value))
            .map_err(|rejection| RentalError::Validation(rejection.body_text()))
    }
}

/// Query string parameters; malformed values are validation errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RentalError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| QueryParams(value))
            .map_err(|rejection| RentalError::Validation(rejection.body_text()))
    }
}

/// Path segments; ids that do not parse are validation errors.
#[derive(Debug, Clone, Copy)]
pub struct PathParams<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = RentalError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| PathParams(value))
            .map_err(|rejection| RentalError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for RentalError {
    fn into_response(self) -> Response {
        let status = match &self {
            RentalError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RentalError::Authorization(_) => StatusCode::FORBIDDEN,
            RentalError::InvalidState(_) => StatusCode::CONFLICT,
            RentalError::NotFound { .. } => StatusCode::NOT_FOUND,
            RentalError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            RentalError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            RentalError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RentalError::Blob(BlobError::Empty) => StatusCode::UNPROCESSABLE_ENTITY,
            RentalError::Blob(BlobError::Missing(_)) => StatusCode::NOT_FOUND,
            RentalError::Blob(BlobError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (status, Json(payload)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterProfileRequest {
    pub role: Role,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub available: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageUploadParams {
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct BookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentFailureRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: u8,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct ComplaintRequest {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ComplaintStatusRequest {
    pub status: ComplaintStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct InboxParams {
    #[serde(default)]
    pub unread: bool,
}

/// Router builder exposing the rental API under `/api/v1`.
pub fn rental_router<R, N>(service: SharedService<R, N>) -> Router
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route("/api/v1/profiles", post(register_profile_handler::<R, N>))
        .route(
            "/api/v1/listings",
            get(browse_listings_handler::<R, N>).post(create_listing_handler::<R, N>),
        )
        .route(
            "/api/v1/listings/:listing_id",
            get(listing_detail_handler::<R, N>).delete(delete_listing_handler::<R, N>),
        )
        .route(
            "/api/v1/listings/:listing_id/availability",
            put(availability_handler::<R, N>),
        )
        .route(
            "/api/v1/listings/:listing_id/images",
            post(upload_image_handler::<R, N>),
        )
        .route(
            "/api/v1/listings/:listing_id/images/:image_id",
            get(image_data_handler::<R, N>),
        )
        .route(
            "/api/v1/listings/:listing_id/bookings",
            post(create_booking_handler::<R, N>),
        )
        .route(
            "/api/v1/listings/:listing_id/reviews",
            post(submit_review_handler::<R, N>),
        )
        .route(
            "/api/v1/listings/:listing_id/complaints",
            post(submit_complaint_handler::<R, N>),
        )
        .route("/api/v1/bookings", get(booking_overview_handler::<R, N>))
        .route(
            "/api/v1/bookings/:booking_id",
            axum::routing::delete(delete_booking_handler::<R, N>),
        )
        .route(
            "/api/v1/bookings/:booking_id/status",
            post(booking_status_handler::<R, N>),
        )
        .route(
            "/api/v1/bookings/:booking_id/payment",
            post(complete_payment_handler::<R, N>),
        )
        .route(
            "/api/v1/bookings/:booking_id/payment/failure",
            post(fail_payment_handler::<R, N>),
        )
        .route(
            "/api/v1/complaints/:complaint_id/acknowledge",
            post(acknowledge_complaint_handler::<R, N>),
        )
        .route(
            "/api/v1/complaints/:complaint_id/status",
            post(complaint_status_handler::<R, N>),
        )
        .route("/api/v1/notifications", get(inbox_handler::<R, N>))
        .route(
            "/api/v1/notifications/:notification_id/read",
            post(mark_read_handler::<R, N>),
        )
        .route(
            "/api/v1/dashboard/landlord",
            get(landlord_dashboard_handler::<R, N>),
        )
        .with_state(service)
}

pub(crate) async fn register_profile_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    JsonBody(request): JsonBody<RegisterProfileRequest>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let profile =
        service.register_profile(identity, request.role, &request.phone, &request.address)?;
    Ok((StatusCode::CREATED, Json(profile)).into_response())
}

pub(crate) async fn browse_listings_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    QueryParams(query): QueryParams<ListingQuery>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let listings = service.browse_listings(&query)?;
    Ok(Json(listings).into_response())
}

pub(crate) async fn create_listing_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    JsonBody(draft): JsonBody<ListingDraft>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let listing = service.create_listing(identity, draft)?;
    Ok((StatusCode::CREATED, Json(listing)).into_response())
}

pub(crate) async fn listing_detail_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    PathParams(listing): PathParams<ListingId>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let detail = service.listing_detail(listing)?;
    Ok(Json(detail).into_response())
}

pub(crate) async fn delete_listing_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    PathParams(listing): PathParams<ListingId>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    service.delete_listing(identity, listing)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn availability_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    PathParams(listing): PathParams<ListingId>,
    JsonBody(request): JsonBody<AvailabilityRequest>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let listing = service.set_listing_availability(identity, listing, request.available)?;
    Ok(Json(listing).into_response())
}

pub(crate) async fn upload_image_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    PathParams(listing): PathParams<ListingId>,
    QueryParams(params): QueryParams<ImageUploadParams>,
    body: Bytes,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let image = service.add_listing_image(identity, listing, body.to_vec(), params.primary)?;
    Ok((StatusCode::CREATED, Json(image)).into_response())
}

pub(crate) async fn image_data_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    PathParams((listing, image)): PathParams<(ListingId, ImageId)>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let (_, bytes) = service.listing_image(listing, image)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}

pub(crate) async fn create_booking_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    PathParams(listing): PathParams<ListingId>,
    JsonBody(request): JsonBody<BookingRequest>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let view = service.create_booking(identity, listing, request.start_date, request.end_date)?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

pub(crate) async fn submit_review_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    PathParams(listing): PathParams<ListingId>,
    JsonBody(request): JsonBody<ReviewRequest>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let review = service.submit_review(identity, listing, request.rating, &request.comment)?;
    Ok((StatusCode::CREATED, Json(review)).into_response())
}

pub(crate) async fn submit_complaint_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    PathParams(listing): PathParams<ListingId>,
    JsonBody(request): JsonBody<ComplaintRequest>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let complaint =
        service.submit_complaint(identity, listing, &request.title, &request.description)?;
    Ok((StatusCode::CREATED, Json(complaint)).into_response())
}

pub(crate) async fn booking_overview_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let bookings = service.booking_overview(identity)?;
    Ok(Json(bookings).into_response())
}

pub(crate) async fn delete_booking_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    PathParams(booking): PathParams<BookingId>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    service.delete_booking(identity, booking)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn booking_status_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    PathParams(booking): PathParams<BookingId>,
    JsonBody(request): JsonBody<BookingStatusRequest>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let view = service.transition_booking(identity, booking, request.status)?;
    Ok(Json(view).into_response())
}

pub(crate) async fn complete_payment_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    PathParams(booking): PathParams<BookingId>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let payment = service.complete_payment(identity, booking)?;
    Ok(Json(payment).into_response())
}

pub(crate) async fn fail_payment_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    PathParams(booking): PathParams<BookingId>,
    JsonBody(request): JsonBody<PaymentFailureRequest>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let payment = service.fail_payment(identity, booking, &request.reason)?;
    Ok(Json(payment).into_response())
}

pub(crate) async fn acknowledge_complaint_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    PathParams(complaint): PathParams<ComplaintId>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let complaint = service.acknowledge_complaint(identity, complaint)?;
    Ok(Json(complaint).into_response())
}

pub(crate) async fn complaint_status_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    PathParams(complaint): PathParams<ComplaintId>,
    JsonBody(request): JsonBody<ComplaintStatusRequest>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let complaint = service.resolve_complaint(identity, complaint, request.status)?;
    Ok(Json(complaint).into_response())
}

pub(crate) async fn inbox_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    QueryParams(params): QueryParams<InboxParams>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let notifications = service.inbox(identity, params.unread)?;
    Ok(Json(notifications).into_response())
}

pub(crate) async fn mark_read_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
    PathParams(notification): PathParams<NotificationId>,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let notification = service.mark_notification_read(identity, notification)?;
    Ok(Json(notification).into_response())
}

pub(crate) async fn landlord_dashboard_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Response, RentalError>
where
    R: RentalRepository + 'static,
    N: NotificationSink + 'static,
{
    let dashboard = service.landlord_dashboard(identity)?;
    Ok(Json(dashboard).into_response())
}
