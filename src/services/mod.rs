pub mod approval;
pub mod auth;
pub mod cache;
pub mod mail;
