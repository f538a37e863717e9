pub mod event_statuses;
pub mod payment_statuses;
pub mod registration_statuses;
pub mod user_roles;
