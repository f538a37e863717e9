use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{events, payments, registrations},
    },
};
use domain::{
    entities::{
        payments::{CompletedSettlement, InsertPaymentEntity, PaymentEntity},
        registrations::RegistrationEntity,
    },
    repositories::payments::PaymentRepository,
    value_objects::enums::{
        payment_statuses::PaymentStatus, registration_statuses::RegistrationPaymentStatus,
    },
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn record_payment(&self, payment: InsertPaymentEntity) -> Result<PaymentEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let payment = insert_into(payments::table)
            .values(&payment)
            .returning(PaymentEntity::as_returning())
            .get_result::<PaymentEntity>(&mut conn)?;

        Ok(payment)
    }

    async fn find_by_transaction_id(
        &self,
        mpesa_transaction_id: String,
    ) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::mpesa_transaction_id.eq(mpesa_transaction_id))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn settle_completed(
        &self,
        payment_id: Uuid,
        mpesa_receipt: Option<String>,
        qr_code_data: String,
    ) -> Result<Option<CompletedSettlement>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<_, diesel::result::Error, _>(|tx| {
            let now = Utc::now();

            let registration_id = match update(payments::table)
                .filter(payments::id.eq(payment_id))
                .filter(payments::status.eq(PaymentStatus::Initiated.as_str()))
                .set((
                    payments::status.eq(PaymentStatus::Completed.as_str()),
                    payments::mpesa_receipt.eq(mpesa_receipt.clone()),
                    payments::updated_at.eq(now),
                ))
                .returning(payments::registration_id)
                .get_result::<Uuid>(tx)
                .optional()?
            {
                Some(registration_id) => registration_id,
                None => return Ok(None),
            };

            let registration = update(registrations::table.find(registration_id))
                .set((
                    registrations::payment_status.eq(RegistrationPaymentStatus::Paid.as_str()),
                    registrations::mpesa_receipt.eq(mpesa_receipt),
                    registrations::qr_code_data.eq(Some(qr_code_data)),
                    registrations::updated_at.eq(now),
                ))
                .returning(RegistrationEntity::as_returning())
                .get_result::<RegistrationEntity>(tx)?;

            let decremented = update(events::table)
                .filter(events::id.eq(registration.event_id))
                .filter(events::available_tickets.ge(registration.ticket_quantity))
                .set((
                    events::available_tickets
                        .eq(events::available_tickets - registration.ticket_quantity),
                    events::updated_at.eq(now),
                ))
                .execute(tx)?;

            Ok(Some(CompletedSettlement {
                registration,
                tickets_decremented: decremented == 1,
            }))
        })?;

        Ok(result)
    }

    async fn settle_failed(&self, payment_id: Uuid) -> Result<Option<Uuid>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<_, diesel::result::Error, _>(|tx| {
            let now = Utc::now();

            let registration_id = match update(payments::table)
                .filter(payments::id.eq(payment_id))
                .filter(payments::status.eq(PaymentStatus::Initiated.as_str()))
                .set((
                    payments::status.eq(PaymentStatus::Failed.as_str()),
                    payments::updated_at.eq(now),
                ))
                .returning(payments::registration_id)
                .get_result::<Uuid>(tx)
                .optional()?
            {
                Some(registration_id) => registration_id,
                None => return Ok(None),
            };

            // A paid registration is never downgraded by a late failure callback.
            update(registrations::table)
                .filter(registrations::id.eq(registration_id))
                .filter(
                    registrations::payment_status.eq(RegistrationPaymentStatus::Pending.as_str()),
                )
                .set((
                    registrations::payment_status.eq(RegistrationPaymentStatus::Failed.as_str()),
                    registrations::updated_at.eq(now),
                ))
                .execute(tx)?;

            Ok(Some(registration_id))
        })?;

        Ok(result)
    }

    async fn list_for_registrations(
        &self,
        registration_ids: Vec<Uuid>,
    ) -> Result<Vec<PaymentEntity>> {
        if registration_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = payments::table
            .filter(payments::registration_id.eq_any(registration_ids))
            .select(PaymentEntity::as_select())
            .order(payments::created_at.desc())
            .load::<PaymentEntity>(&mut conn)?;

        Ok(results)
    }
}
