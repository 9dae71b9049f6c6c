pub mod account_service;
pub mod task_service;

pub use account_service::AccountManager;
pub use task_service::TaskManager;
