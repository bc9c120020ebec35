pub mod audit_entry;
pub mod cancellation_flag;
pub mod ledger_entry;
pub mod migration_run;
