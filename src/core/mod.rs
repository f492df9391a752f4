pub mod processor;
pub mod recovery;
pub mod run_state;
pub mod stats;
