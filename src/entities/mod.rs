pub mod prelude;

pub mod activity_log;
pub mod analysis_results;
pub mod reports;
pub mod sequences;
pub mod users;
