pub mod audit_repo;
pub mod cancellation_repo;
pub mod ledger_repo;
pub mod run_repo;

pub use audit_repo::AuditRepo;
pub use cancellation_repo::CancellationRepo;
pub use ledger_repo::LedgerRepo;
pub use run_repo::RunRepo;
