/// Database access for identity-service
pub mod users;
