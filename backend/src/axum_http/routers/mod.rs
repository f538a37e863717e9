pub mod auth;
pub mod events;
pub mod payments;
pub mod reviews;
pub mod users;
