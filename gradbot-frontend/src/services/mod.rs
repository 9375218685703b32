pub mod detached;
pub mod metrics;
