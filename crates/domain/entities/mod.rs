pub mod event_reviews;
pub mod events;
pub mod payments;
pub mod registrations;
pub mod users;
