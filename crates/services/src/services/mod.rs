pub mod affiliation;
pub mod cancellation;
pub mod identity;
pub mod merge;
pub mod profile_client;
pub mod profile_sync;
pub mod settings;
pub mod user_store;
