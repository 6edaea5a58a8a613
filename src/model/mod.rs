pub mod book;
pub mod completion;
pub mod config;
pub mod project;
pub mod recurrence;
pub mod task;

pub use book::*;
pub use completion::*;
pub use config::*;
pub use project::*;
pub use recurrence::*;
pub use task::*;
