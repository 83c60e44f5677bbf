pub mod hooks;
pub mod profile;
