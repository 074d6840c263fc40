pub mod accounts;
pub mod tasks;

pub use accounts::{AccountManager, LoginOutcome};
pub use tasks::TaskManager;
