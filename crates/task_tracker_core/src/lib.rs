pub mod analytics;
pub mod domain;
pub mod memory;
pub mod ports;
pub mod sample;
pub mod tasks;

pub use analytics::{Analytics, Window, WindowError};
pub use domain::{
    AuthSession, CategoryBucket, CategoryCount, CompletionFilter, NewTask, Overview, Priority,
    ProductivityPoint, Task, TaskActivity, TaskFilter, TaskPatch, User, UserCredentials,
    LOCAL_OWNER_ID,
};
pub use memory::MemoryTaskStore;
pub use ports::{PortError, PortResult, TaskStore, UserStore};
