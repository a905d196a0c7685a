//! User aggregate
//!
//! The authenticated user, its role and the partial update DTO.

pub mod model;

mod dto_update;

pub use model::{User, UserRole};

pub use dto_update::UpdateUserDto;
