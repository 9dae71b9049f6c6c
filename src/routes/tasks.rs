use crate::{
    error::AppError,
    models::{CreateTaskRequest, UpdateTaskRequest},
    services::TaskManager,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};

/// Retrieves every task.
///
/// Each task's `status` reflects the current time: a finished window reads `Completed` and
/// an open one reads `Overdue`. The derived value is not written back.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Task` objects.
#[get("")]
pub async fn get_tasks(tasks: web::Data<TaskManager>) -> Result<impl Responder, AppError> {
    let all = tasks.find_all().await?;
    Ok(HttpResponse::Ok().json(all))
}

/// Creates a new task.
///
/// ## Request Body:
/// - `title`: 1 to 200 characters.
/// - `category`: one of `Work`, `Personal`, `Home`.
/// - `description` (optional): at most 1000 characters.
/// - `start`, `end`: RFC 3339 timestamps, not in the past, `start <= end`.
/// - `userId`: owner of the task.
///
/// A `status` in the body is ignored; new tasks are `Pending`.
///
/// ## Responses:
/// - `201 Created`: the created `Task`.
/// - `400 Bad Request`: validation failure, with the reason in `message`.
#[post("")]
pub async fn create_task(
    tasks: web::Data<TaskManager>,
    task_data: web::Json<CreateTaskRequest>,
) -> Result<impl Responder, AppError> {
    let task = tasks.create(task_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(task))
}

/// ## Responses:
/// - `200 OK`: the `Task` with its stored status.
/// - `404 Not Found`: no task with that id.
#[get("/{id}")]
pub async fn get_task(
    tasks: web::Data<TaskManager>,
    task_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let task = tasks.find_one(task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates a task. When `start` or `end` is sent, both are required and checked
/// like on creation.
#[patch("/{id}")]
pub async fn update_task(
    tasks: web::Data<TaskManager>,
    task_id: web::Path<i32>,
    task_data: web::Json<UpdateTaskRequest>,
) -> Result<impl Responder, AppError> {
    let task = tasks
        .update(task_id.into_inner(), task_data.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task and answers with the plain-text body `success`.
#[delete("/{id}")]
pub async fn delete_task(
    tasks: web::Data<TaskManager>,
    task_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let outcome = tasks.remove(task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().content_type("text/plain").body(outcome))
}
