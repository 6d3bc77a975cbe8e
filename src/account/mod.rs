//! Account model: kinds, reserved well-known ids, balance reads, tag binding.

pub mod models;
mod repository;

pub use models::{Account, AccountKind, reserved};
pub use repository::AccountRepository;
