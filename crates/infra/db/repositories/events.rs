use anyhow::Result;
use async_trait::async_trait;
use diesel::{dsl::count_star, insert_into, prelude::*, update};
use std::{collections::HashMap, sync::Arc};
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
        events::{EventEntity, InsertEventEntity, UpdateEventEntity},
        users::UserSummaryEntity,
    },
    repositories::events::EventRepository,
    value_objects::events::ListEventsFilter,
};

pub struct EventPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl EventPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl EventRepository for EventPostgres {
    async fn list(
        &self,
        filter: ListEventsFilter,
    ) -> Result<(Vec<(EventEntity, UserSummaryEntity)>, i64)> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let status = filter.status.to_string();

        let mut query = events::table
            .inner_join(users::table.on(events::organizer_id.eq(users::id)))
            .select((EventEntity::as_select(), UserSummaryEntity::as_select()))
            .filter(events::status.eq(status.clone()))
            .into_boxed();

        let mut count_query = events::table
            .select(count_star())
            .filter(events::status.eq(status))
            .into_boxed();

        if let Some(category) = &filter.category {
            query = query.filter(events::category.eq(category.clone()));
            count_query = count_query.filter(events::category.eq(category.clone()));
        }

        if let Some(location) = &filter.location {
            let pattern = format!("%{}%", location);
            query = query.filter(events::location.ilike(pattern.clone()));
            count_query = count_query.filter(events::location.ilike(pattern));
        }

        if let Some(date) = filter.date {
            query = query.filter(events::event_date.eq(date));
            count_query = count_query.filter(events::event_date.eq(date));
        }

        let total = count_query.first::<i64>(&mut conn)?;

        let results = query
            .order((events::event_date.asc(), events::created_at.asc()))
            .offset(filter.offset)
            .limit(filter.limit)
            .load::<(EventEntity, UserSummaryEntity)>(&mut conn)?;

        Ok((results, total))
    }

    async fn find_by_id(&self, event_id: Uuid) -> Result<Option<EventEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = events::table
            .filter(events::id.eq(event_id))
            .select(EventEntity::as_select())
            .first::<EventEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_with_organizer(
        &self,
        event_id: Uuid,
    ) -> Result<Option<(EventEntity, UserSummaryEntity)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = events::table
            .inner_join(users::table.on(events::organizer_id.eq(users::id)))
            .filter(events::id.eq(event_id))
            .select((EventEntity::as_select(), UserSummaryEntity::as_select()))
            .first::<(EventEntity, UserSummaryEntity)>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn create(&self, insert_event_entity: InsertEventEntity) -> Result<EventEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let event = insert_into(events::table)
            .values(&insert_event_entity)
            .returning(EventEntity::as_returning())
            .get_result::<EventEntity>(&mut conn)?;

        Ok(event)
    }

    async fn update(
        &self,
        event_id: Uuid,
        update_event_entity: UpdateEventEntity,
        max_attendees: Option<i32>,
    ) -> Result<Option<EventEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<_, diesel::result::Error, _>(|tx| {
            if let Some(new_max) = max_attendees {
                // Relative to the stored counter, so decrements committed since the caller's
                // read are kept.
                let resized = update(events::table)
                    .filter(events::id.eq(event_id))
                    .filter((events::max_attendees - events::available_tickets).le(new_max))
                    .set((
                        events::available_tickets
                            .eq(events::available_tickets + new_max - events::max_attendees),
                        events::max_attendees.eq(new_max),
                    ))
                    .execute(tx)?;

                if resized == 0 {
                    return Ok(None);
                }
            }

            let event = update(events::table.find(event_id))
                .set(&update_event_entity)
                .returning(EventEntity::as_returning())
                .get_result::<EventEntity>(tx)?;

            Ok(Some(event))
        })?;

        Ok(result)
    }

    async fn list_by_organizer(&self, organizer_id: Uuid) -> Result<Vec<EventEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = events::table
            .filter(events::organizer_id.eq(organizer_id))
            .select(EventEntity::as_select())
            .order(events::created_at.desc())
            .load::<EventEntity>(&mut conn)?;

        Ok(results)
    }

    async fn count_registrations(&self, event_ids: Vec<Uuid>) -> Result<HashMap<Uuid, i64>> {
        if event_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = registrations::table
            .filter(registrations::event_id.eq_any(event_ids))
            .group_by(registrations::event_id)
            .select((registrations::event_id, count_star()))
            .load::<(Uuid, i64)>(&mut conn)?;

        Ok(rows.into_iter().collect())
    }
}
