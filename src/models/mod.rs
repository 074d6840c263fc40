pub mod task;
pub mod user;

pub use task::{NewTask, Task, TaskInput, TaskPage, TaskQuery, TaskStatus, TaskUpdate};
pub use user::{NewUser, User, UserInput, UserProfile};
