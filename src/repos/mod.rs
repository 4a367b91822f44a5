pub mod error;
pub mod leave_repo;
pub mod user_repo;

pub use leave_repo::{LeaveDetails, LeaveRepo};
pub use user_repo::UserRepo;
