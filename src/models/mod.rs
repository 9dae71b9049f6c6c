pub mod task;
pub mod user;

pub use task::{
    validate_schedule, CreateTaskRequest, NewTask, Task, TaskCategory, TaskChanges, TaskStatus,
    UpdateTaskRequest,
};
pub use user::{
    AuthResponse, LoginRequest, NewUser, RefreshRequest, RegisterRequest, UpdateUserRequest, User,
    UserChanges, DEFAULT_LANG,
};
