use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError, ValidationErrors};

/// The fixed set of task categories.
/// Corresponds to the `task_category` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_category")]
pub enum TaskCategory {
    Work,
    Personal,
    Home,
}

impl FromStr for TaskCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Work" => Ok(TaskCategory::Work),
            "Personal" => Ok(TaskCategory::Personal),
            "Home" => Ok(TaskCategory::Home),
            _ => Err(()),
        }
    }
}

/// Status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    /// Not started yet. Every task is stored with this status on creation.
    Pending,
    /// The current time lies inside the task's window.
    Overdue,
    /// The task's window has ended.
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Overdue => "Overdue",
            TaskStatus::Completed => "Completed",
        };
        f.write_str(label)
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(TaskStatus::Pending),
            "Overdue" => Ok(TaskStatus::Overdue),
            "Completed" => Ok(TaskStatus::Completed),
            _ => Err(()),
        }
    }
}

/// Represents a task as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub category: TaskCategory,
    pub description: Option<String>,
    pub status: TaskStatus,
    #[sqlx(rename = "start_at")]
    pub start: DateTime<Utc>,
    #[sqlx(rename = "end_at")]
    pub end: DateTime<Utc>,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Status to display at `now`. A finished window reads `Completed`, an open window
    /// reads `Overdue`, anything else keeps the stored status.
    pub fn status_at(&self, now: DateTime<Utc>) -> TaskStatus {
        if self.end < now {
            TaskStatus::Completed
        } else if self.start < now && now < self.end {
            TaskStatus::Overdue
        } else {
            self.status
        }
    }
}

/// Everything the store needs to insert a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub category: TaskCategory,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub user_id: i32,
}

/// Column changes applied by the store; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub category: Option<TaskCategory>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

fn validate_category(value: &str) -> Result<(), ValidationError> {
    value.parse::<TaskCategory>().map(|_| ()).map_err(|_| {
        let mut error = ValidationError::new("invalid_category");
        error.message = Some(
            "The category provided is not valid. Valid categories Work, Personal and Home.".into(),
        );
        error
    })
}

fn validate_status(value: &str) -> Result<(), ValidationError> {
    value.parse::<TaskStatus>().map(|_| ()).map_err(|_| {
        let mut error = ValidationError::new("invalid_status");
        error.message = Some(
            "The status provided is not valid. Valid statuses Pending, Overdue and Completed."
                .into(),
        );
        error
    })
}

/// Input for creating a task. Category and status arrive as strings so that an unknown
/// value is reported as a field error instead of a body parse failure.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters."))]
    pub title: String,
    #[validate(custom = "validate_category")]
    pub category: String,
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters."))]
    pub description: Option<String>,
    /// Accepted for compatibility and ignored: new tasks always start as `Pending`.
    pub status: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub user_id: i32,
}

/// Partial update of a task.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters."))]
    pub title: Option<String>,
    #[validate(custom = "validate_category")]
    pub category: Option<String>,
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters."))]
    pub description: Option<String>,
    #[validate(custom = "validate_status")]
    pub status: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

fn schedule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Checks a task window against `now`. Each failing field carries its own reason code:
/// `required`, then `past_date`, then `end_before_start`; the first failing stage wins.
pub fn validate_schedule(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (start, end) => {
            let error = schedule_error("required", "Start and end dates must be valid.");
            if start.is_none() {
                errors.add("start", error.clone());
            }
            if end.is_none() {
                errors.add("end", error);
            }
            return Err(errors);
        }
    };

    if start < now || end < now {
        let error = schedule_error("past_date", "Start and end dates must be in the future.");
        if start < now {
            errors.add("start", error.clone());
        }
        if end < now {
            errors.add("end", error);
        }
        return Err(errors);
    }

    if end < start {
        errors.add(
            "end",
            schedule_error("end_before_start", "End date cannot be earlier than start date."),
        );
        return Err(errors);
    }

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Task {
        Task {
            id: 1,
            title: "Write report".into(),
            category: TaskCategory::Work,
            description: None,
            status: TaskStatus::Pending,
            start,
            end,
            user_id: 1,
            created_at: start,
            updated_at: start,
        }
    }

    fn codes(errors: &ValidationErrors, field: &str) -> Vec<String> {
        errors
            .field_errors()
            .get(field)
            .map(|errs| errs.iter().map(|e| e.code.to_string()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_status_timeline() {
        let now = Utc::now();
        let task = task_between(now + Duration::hours(1), now + Duration::hours(2));

        assert_eq!(task.status_at(now), TaskStatus::Pending);
        assert_eq!(task.status_at(now + Duration::minutes(90)), TaskStatus::Overdue);
        assert_eq!(task.status_at(now + Duration::hours(3)), TaskStatus::Completed);
    }

    #[test]
    fn test_status_at_exact_end_keeps_stored_status() {
        let now = Utc::now();
        let task = task_between(now - Duration::hours(1), now);
        assert_eq!(task.status_at(now), TaskStatus::Pending);
    }

    #[test]
    fn test_schedule_accepts_future_window() {
        let now = Utc::now();
        let start = now + Duration::hours(1);
        let end = now + Duration::hours(2);
        assert_eq!(validate_schedule(Some(start), Some(end), now).unwrap(), (start, end));
        assert!(validate_schedule(Some(start), Some(start), now).is_ok());
    }

    #[test]
    fn test_schedule_reports_missing_fields() {
        let now = Utc::now();
        let errors = validate_schedule(Some(now + Duration::hours(1)), None, now).unwrap_err();
        assert_eq!(codes(&errors, "end"), vec!["required"]);
        assert!(codes(&errors, "start").is_empty());
    }

    #[test]
    fn test_schedule_reports_past_dates() {
        let now = Utc::now();
        let errors = validate_schedule(
            Some(now - Duration::hours(1)),
            Some(now + Duration::hours(1)),
            now,
        )
        .unwrap_err();
        assert_eq!(codes(&errors, "start"), vec!["past_date"]);
        assert!(codes(&errors, "end").is_empty());
    }

    #[test]
    fn test_schedule_reports_inverted_window() {
        let now = Utc::now();
        let errors = validate_schedule(
            Some(now + Duration::hours(2)),
            Some(now + Duration::hours(1)),
            now,
        )
        .unwrap_err();
        assert_eq!(codes(&errors, "end"), vec!["end_before_start"]);
    }

    #[test]
    fn test_task_request_validation() {
        let valid = CreateTaskRequest {
            title: "Valid Task".into(),
            category: "Home".into(),
            description: Some("Valid Description".into()),
            status: None,
            start: None,
            end: None,
            user_id: 1,
        };
        assert!(valid.validate().is_ok());

        let invalid = CreateTaskRequest {
            title: "".into(),
            category: "Garden".into(),
            description: Some("b".repeat(1001)),
            status: None,
            start: None,
            end: None,
            user_id: 1,
        };
        let errors = invalid.validate().unwrap_err();
        assert_eq!(codes(&errors, "category"), vec!["invalid_category"]);
        assert_eq!(codes(&errors, "title"), vec!["length"]);
        assert_eq!(codes(&errors, "description"), vec!["length"]);
    }

    #[test]
    fn test_update_request_rejects_unknown_status() {
        let patch = UpdateTaskRequest {
            status: Some("Done".into()),
            ..Default::default()
        };
        let errors = patch.validate().unwrap_err();
        assert_eq!(codes(&errors, "status"), vec!["invalid_status"]);
    }

    #[test]
    fn test_enums_serialize_with_their_names() {
        assert_eq!(serde_json::to_value(TaskCategory::Personal).unwrap(), "Personal");
        assert_eq!(serde_json::to_value(TaskStatus::Overdue).unwrap(), "Overdue");
        assert_eq!(TaskStatus::Completed.to_string(), "Completed");
    }
}
