pub mod audit;
pub mod runs;
