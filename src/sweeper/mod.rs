pub mod scheduler;
pub mod worker;

pub use scheduler::{CycleReport, CycleScheduler, SchedulerState};
pub use worker::{net_transfer_amount, SweepWorker, WorkerSettings};
