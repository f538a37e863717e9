pub mod enums;
pub mod event_reviews;
pub mod events;
pub mod payments;
pub mod phone_numbers;
pub mod registrations;
pub mod users;
