use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use crates::domain::{
    entities::events::{EventEntity, InsertEventEntity, UpdateEventEntity},
    repositories::{events::EventRepository, registrations::RegistrationRepository},
    value_objects::{
        enums::{event_statuses::EventStatus, user_roles::UserRole},
        events::{
            CreateEventModel, DEFAULT_PAGE, DEFAULT_PAGE_LIMIT, EventDto, EventListDto,
            EventWithOrganizerDto, ListEventsFilter, ListEventsQuery, MAX_PAGE_LIMIT,
            MAX_TICKET_PRICE_MINOR,
            OrganizerDto, OrganizerEventDto, PaginationDto, UpdateEventModel,
        },
        registrations::AttendeeRegistrationDto,
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::axum_http::error_responses::AppError;

pub const ACCESS_DENIED: &str = "Access denied. Insufficient permissions.";
const CAP_BELOW_SOLD: &str = "Cannot reduce max attendees below the tickets already sold";

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event not found")]
    NotFound,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("Invalid ticket for this event")]
    InvalidTicket,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl EventError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EventError::NotFound | EventError::InvalidTicket => StatusCode::NOT_FOUND,
            EventError::Forbidden(_) => StatusCode::FORBIDDEN,
            EventError::Validation(_) => StatusCode::BAD_REQUEST,
            EventError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EventError> for AppError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::Internal(e) => AppError::Internal(e),
            EventError::Forbidden(message) => AppError::Forbidden(message.to_string()),
            EventError::Validation(message) => AppError::bad_request(message),
            other => AppError::NotFound(other.to_string()),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, EventError>;

/// Normalises paging input: page ≥ 1, 1 ≤ limit ≤ 100.
pub fn page_window(page: Option<i64>, limit: Option<i64>) -> (i64, i64, i64) {
    let page = page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE);
    let limit = limit
        .filter(|l| *l >= 1)
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .min(MAX_PAGE_LIMIT);
    let offset = (page - 1).saturating_mul(limit);
    (page, limit, offset)
}

fn check_ticket_price(price_minor: i64) -> UseCaseResult<()> {
    if price_minor < 0 {
        return Err(EventError::Validation(
            "Ticket price cannot be negative".to_string(),
        ));
    }
    if price_minor > MAX_TICKET_PRICE_MINOR {
        return Err(EventError::Validation(format!(
            "Ticket price cannot exceed {} minor units",
            MAX_TICKET_PRICE_MINOR
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct EventUseCase<E, R>
where
    E: EventRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
{
    event_repo: Arc<E>,
    registration_repo: Arc<R>,
}

impl<E, R> EventUseCase<E, R>
where
    E: EventRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
{
    pub fn new(event_repo: Arc<E>, registration_repo: Arc<R>) -> Self {
        Self {
            event_repo,
            registration_repo,
        }
    }

    fn ensure_manager(role: UserRole) -> UseCaseResult<()> {
        if role.can_manage_events() {
            Ok(())
        } else {
            Err(EventError::Forbidden(ACCESS_DENIED))
        }
    }

    async fn load_event(&self, event_id: Uuid) -> UseCaseResult<EventEntity> {
        self.event_repo
            .find_by_id(event_id)
            .await
            .map_err(|err| {
                error!(%event_id, db_error = ?err, "events: failed to load event");
                EventError::Internal(err)
            })?
            .ok_or(EventError::NotFound)
    }

    fn ensure_owner(
        event: &EventEntity,
        user_id: Uuid,
        role: UserRole,
        message: &'static str,
    ) -> UseCaseResult<()> {
        if role == UserRole::Admin || event.organizer_id == user_id {
            Ok(())
        } else {
            Err(EventError::Forbidden(message))
        }
    }

    pub async fn list(&self, query: ListEventsQuery) -> UseCaseResult<EventListDto> {
        let (page, limit, offset) = page_window(query.page, query.limit);

        let filter = ListEventsFilter {
            status: EventStatus::Published,
            category: non_blank(query.category),
            location: non_blank(query.location),
            date: query.date,
            offset,
            limit,
        };

        let (rows, total) = self.event_repo.list(filter).await.map_err(|err| {
            error!(db_error = ?err, "events: failed to list published events");
            EventError::Internal(err)
        })?;

        info!(page, limit, total, "events: listed published events");

        Ok(EventListDto {
            events: rows
                .into_iter()
                .map(|(event, organizer)| EventWithOrganizerDto {
                    event: event.into(),
                    organizer: OrganizerDto::public(organizer),
                    registration_count: None,
                })
                .collect(),
            pagination: PaginationDto { page, limit, total },
        })
    }

    pub async fn get(&self, event_id: Uuid) -> UseCaseResult<EventWithOrganizerDto> {
        let (event, organizer) = self
            .event_repo
            .find_with_organizer(event_id)
            .await
            .map_err(|err| {
                error!(%event_id, db_error = ?err, "events: failed to load event");
                EventError::Internal(err)
            })?
            .ok_or(EventError::NotFound)?;

        let counts = self
            .event_repo
            .count_registrations(vec![event_id])
            .await
            .map_err(|err| {
                error!(%event_id, db_error = ?err, "events: failed to count registrations");
                EventError::Internal(err)
            })?;

        Ok(EventWithOrganizerDto {
            event: event.into(),
            organizer: OrganizerDto::with_contact(organizer),
            registration_count: Some(counts.get(&event_id).copied().unwrap_or(0)),
        })
    }

    pub async fn create(
        &self,
        organizer_id: Uuid,
        role: UserRole,
        model: CreateEventModel,
    ) -> UseCaseResult<EventWithOrganizerDto> {
        Self::ensure_manager(role)?;

        let title = model.title.trim().to_string();
        if title.is_empty() {
            return Err(EventError::Validation("Title is required".to_string()));
        }
        if model.max_attendees < 1 {
            return Err(EventError::Validation(
                "Max attendees must be at least 1".to_string(),
            ));
        }
        let ticket_price_minor = model.ticket_price_minor.unwrap_or(0);
        check_ticket_price(ticket_price_minor)?;

        let now = Utc::now();
        let created = self
            .event_repo
            .create(InsertEventEntity {
                title,
                description: model.description,
                location: model.location,
                venue: model.venue,
                event_date: model.event_date,
                event_time: model.event_time,
                category: non_blank(model.category),
                ticket_price_minor,
                available_tickets: model.max_attendees,
                max_attendees: model.max_attendees,
                organizer_id,
                image_url: model.image_url,
                status: EventStatus::Draft.to_string(),
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|err| {
                error!(%organizer_id, db_error = ?err, "events: failed to create event");
                EventError::Internal(err)
            })?;

        info!(event_id = %created.id, %organizer_id, "events: event created");

        let (event, organizer) = self
            .event_repo
            .find_with_organizer(created.id)
            .await
            .map_err(EventError::Internal)?
            .ok_or(EventError::NotFound)?;

        Ok(EventWithOrganizerDto {
            event: event.into(),
            organizer: OrganizerDto::public(organizer),
            registration_count: None,
        })
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        role: UserRole,
        event_id: Uuid,
        model: UpdateEventModel,
    ) -> UseCaseResult<EventDto> {
        Self::ensure_manager(role)?;

        let existing = self.load_event(event_id).await?;
        Self::ensure_owner(
            &existing,
            user_id,
            role,
            "Access denied. You can only update your own events.",
        )?;

        let (changes, max_attendees) = build_event_changes(&existing, model)?;

        let updated = self
            .event_repo
            .update(event_id, changes, max_attendees)
            .await
            .map_err(|err| {
                error!(%event_id, db_error = ?err, "events: failed to update event");
                EventError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%event_id, ?max_attendees, "events: cap fell below tickets sold since read");
                EventError::Validation(CAP_BELOW_SOLD.to_string())
            })?;

        info!(%event_id, %user_id, status = %updated.status, "events: event updated");
        Ok(updated.into())
    }

    pub async fn my_events(
        &self,
        organizer_id: Uuid,
        role: UserRole,
    ) -> UseCaseResult<Vec<OrganizerEventDto>> {
        Self::ensure_manager(role)?;

        let events = self
            .event_repo
            .list_by_organizer(organizer_id)
            .await
            .map_err(|err| {
                error!(%organizer_id, db_error = ?err, "events: failed to list organizer events");
                EventError::Internal(err)
            })?;

        let counts = self
            .event_repo
            .count_registrations(events.iter().map(|event| event.id).collect())
            .await
            .map_err(EventError::Internal)?;

        Ok(events
            .into_iter()
            .map(|event| OrganizerEventDto {
                registration_count: counts.get(&event.id).copied().unwrap_or(0),
                event: event.into(),
            })
            .collect())
    }

    pub async fn verify_ticket(
        &self,
        user_id: Uuid,
        role: UserRole,
        event_id: Uuid,
        qr_data: String,
    ) -> UseCaseResult<AttendeeRegistrationDto> {
        Self::ensure_manager(role)?;

        let qr_data = qr_data.trim().to_string();
        if qr_data.is_empty() {
            return Err(EventError::Validation("QR data is required".to_string()));
        }

        let event = self.load_event(event_id).await?;
        Self::ensure_owner(
            &event,
            user_id,
            role,
            "Access denied. You can only verify tickets for your own events.",
        )?;

        let (registration, attendee) = self
            .registration_repo
            .find_paid_ticket(event_id, qr_data)
            .await
            .map_err(|err| {
                error!(%event_id, db_error = ?err, "events: failed to look up ticket");
                EventError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%event_id, %user_id, "events: ticket did not match a paid registration");
                EventError::InvalidTicket
            })?;

        info!(%event_id, registration_id = %registration.id, "events: ticket verified");
        Ok(AttendeeRegistrationDto::new(registration, None, attendee))
    }
}

/// Turns a partial update into a changeset plus the new cap, if it changes. The cap is
/// checked against the tickets sold as of `existing`; the repository re-checks it in SQL.
pub fn build_event_changes(
    existing: &EventEntity,
    model: UpdateEventModel,
) -> UseCaseResult<(UpdateEventEntity, Option<i32>)> {
    let title = match model.title {
        Some(title) if title.trim().is_empty() => {
            return Err(EventError::Validation("Title cannot be empty".to_string()));
        }
        Some(title) => Some(title.trim().to_string()),
        None => None,
    };

    if let Some(price) = model.ticket_price_minor {
        check_ticket_price(price)?;
    }

    let max_attendees = match model.max_attendees {
        Some(new_max) if new_max != existing.max_attendees => {
            if new_max < 1 {
                return Err(EventError::Validation(
                    "Max attendees must be at least 1".to_string(),
                ));
            }
            let sold = existing.max_attendees - existing.available_tickets;
            if new_max < sold {
                return Err(EventError::Validation(format!(
                    "Cannot reduce max attendees below the {} tickets already sold",
                    sold
                )));
            }
            Some(new_max)
        }
        _ => None,
    };

    let changes = UpdateEventEntity {
        title,
        description: model.description,
        location: model.location,
        venue: model.venue,
        event_date: model.event_date,
        event_time: model.event_time,
        category: model.category,
        ticket_price_minor: model.ticket_price_minor,
        image_url: model.image_url,
        status: model.status.map(|status| status.to_string()),
        updated_at: Some(Utc::now()),
    };

    Ok((changes, max_attendees))
}
