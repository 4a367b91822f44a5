pub mod approval;
pub mod auth;
pub mod debug;
pub mod health;
pub mod leave;
pub mod spa;
