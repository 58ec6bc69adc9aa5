pub mod debug_log;
pub mod table_csv;

pub use debug_log::write_run_log;
pub use table_csv::{read_trajectory_csv, write_trajectory_csv};
