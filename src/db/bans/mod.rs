//! Repository for channel restriction records (bans and quiets).

mod models;
mod queries;

pub use models::{BanRecord, DueRestriction, RestrictionKind};
pub use queries::BanRepository;
