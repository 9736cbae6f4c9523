//! Client credential lifecycle and account administration.
//!
//! Services validate and shape records; the storage layer owns durability,
//! uniqueness, and token expiry.

pub mod audit;
pub mod clients;
pub mod credentials;
pub mod dashboard;
pub mod fields;
pub mod types;
pub mod users;

pub use audit::AuditTrail;
pub use clients::ClientAdministrationService;
pub use dashboard::DashboardService;
pub use users::UserAdministrationService;
