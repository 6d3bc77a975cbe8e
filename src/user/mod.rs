mod models;
mod repository;

pub use models::{CurrentUser, Privilege, Role, User, UserInfo};
pub use repository::UserRepository;
