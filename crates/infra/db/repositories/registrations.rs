use anyhow::Result;
use async_trait::async_trait;
use diesel::{dsl::exists, insert_into, prelude::*, select, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{events, registrations, users},
    },
};
use domain::{
    entities::{
        events::EventEntity,
        registrations::{
            InsertRegistrationEntity, RegistrationEntity, UpdatePendingRegistrationEntity,
        },
        users::UserSummaryEntity,
    },
    repositories::registrations::RegistrationRepository,
    value_objects::enums::registration_statuses::RegistrationPaymentStatus,
};

pub struct RegistrationPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl RegistrationPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl RegistrationRepository for RegistrationPostgres {
    async fn find_by_id(&self, registration_id: Uuid) -> Result<Option<RegistrationEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = registrations::table
            .filter(registrations::id.eq(registration_id))
            .select(RegistrationEntity::as_select())
            .first::<RegistrationEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_pending(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<RegistrationEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = registrations::table
            .filter(registrations::user_id.eq(user_id))
            .filter(registrations::event_id.eq(event_id))
            .filter(registrations::payment_status.eq(RegistrationPaymentStatus::Pending.as_str()))
            .select(RegistrationEntity::as_select())
            .order(registrations::created_at.desc())
            .first::<RegistrationEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn create(
        &self,
        insert_registration_entity: InsertRegistrationEntity,
    ) -> Result<RegistrationEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let registration = insert_into(registrations::table)
            .values(&insert_registration_entity)
            .returning(RegistrationEntity::as_returning())
            .get_result::<RegistrationEntity>(&mut conn)?;

        Ok(registration)
    }

    async fn update_pending(
        &self,
        registration_id: Uuid,
        update_entity: UpdatePendingRegistrationEntity,
    ) -> Result<Option<RegistrationEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let registration = update(registrations::table)
            .filter(registrations::id.eq(registration_id))
            .filter(registrations::payment_status.eq(RegistrationPaymentStatus::Pending.as_str()))
            .set(&update_entity)
            .returning(RegistrationEntity::as_returning())
            .get_result::<RegistrationEntity>(&mut conn)
            .optional()?;

        Ok(registration)
    }

    async fn has_paid_registration(&self, user_id: Uuid, event_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let found = select(exists(
            registrations::table
                .filter(registrations::user_id.eq(user_id))
                .filter(registrations::event_id.eq(event_id))
                .filter(registrations::payment_status.eq(RegistrationPaymentStatus::Paid.as_str())),
        ))
        .get_result::<bool>(&mut conn)?;

        Ok(found)
    }

    async fn find_for_user_with_event(
        &self,
        user_id: Uuid,
        registration_id: Uuid,
    ) -> Result<Option<(RegistrationEntity, EventEntity)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = registrations::table
            .inner_join(events::table.on(registrations::event_id.eq(events::id)))
            .filter(registrations::id.eq(registration_id))
            .filter(registrations::user_id.eq(user_id))
            .select((RegistrationEntity::as_select(), EventEntity::as_select()))
            .first::<(RegistrationEntity, EventEntity)>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_for_user_with_events(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(RegistrationEntity, EventEntity)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = registrations::table
            .inner_join(events::table.on(registrations::event_id.eq(events::id)))
            .filter(registrations::user_id.eq(user_id))
            .select((RegistrationEntity::as_select(), EventEntity::as_select()))
            .order(registrations::created_at.desc())
            .load::<(RegistrationEntity, EventEntity)>(&mut conn)?;

        Ok(results)
    }

    async fn list_for_organizer(
        &self,
        organizer_id: Uuid,
    ) -> Result<Vec<(RegistrationEntity, EventEntity, UserSummaryEntity)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = registrations::table
            .inner_join(events::table.on(registrations::event_id.eq(events::id)))
            .inner_join(users::table.on(registrations::user_id.eq(users::id)))
            .filter(events::organizer_id.eq(organizer_id))
            .select((
                RegistrationEntity::as_select(),
                EventEntity::as_select(),
                UserSummaryEntity::as_select(),
            ))
            .order(registrations::created_at.desc())
            .load::<(RegistrationEntity, EventEntity, UserSummaryEntity)>(&mut conn)?;

        Ok(results)
    }

    async fn find_paid_ticket(
        &self,
        event_id: Uuid,
        qr_data: String,
    ) -> Result<Option<(RegistrationEntity, UserSummaryEntity)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = registrations::table
            .inner_join(users::table.on(registrations::user_id.eq(users::id)))
            .select((RegistrationEntity::as_select(), UserSummaryEntity::as_select()))
            .filter(registrations::event_id.eq(event_id))
            .filter(registrations::payment_status.eq(RegistrationPaymentStatus::Paid.as_str()))
            .into_boxed();

        // Older tickets encode the bare registration id instead of a QR token.
        query = match Uuid::parse_str(qr_data.trim()) {
            Ok(registration_id) => query.filter(
                registrations::id
                    .eq(registration_id)
                    .nullable()
                    .or(registrations::qr_code_data.eq(qr_data.clone())),
            ),
            Err(_) => query.filter(registrations::qr_code_data.eq(qr_data.clone())),
        };

        let result = query
            .first::<(RegistrationEntity, UserSummaryEntity)>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
