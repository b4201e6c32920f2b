//! Domain types for ledger reconciliation

pub mod event;
pub mod position;
pub mod record;
pub mod row;
pub mod summary;

pub use event::{DealRole, EnrichedEvent, RawEventRecord};
pub use position::Position;
pub use record::Record;
pub use row::Row;
pub use summary::DailySummaryRecord;
