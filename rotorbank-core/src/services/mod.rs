//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod bank;
mod doctor;
pub mod ledger;
pub mod logging;
mod transfer;

pub use bank::{AccountHandle, Bank};
pub use doctor::{CheckResult, DoctorResult, DoctorService, DoctorSummary};
pub use ledger::{LedgerLayout, LedgerStore, DEFAULT_FILENAME_TEMPLATE};
pub use logging::{events, EntryPoint, LogEntry, LogEvent, LoggingService};
pub use transfer::TransferCoordinator;
