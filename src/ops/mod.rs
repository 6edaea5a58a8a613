pub mod agenda;
pub mod completion;
pub mod schedule;
pub mod task_ops;
