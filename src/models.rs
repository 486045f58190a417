use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::progress;

#[derive(Debug, Error)]
#[error("unknown {field} value: {value:?}")]
pub struct ParseFieldError {
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationType {
    EarlyDecision,
    EarlyAction,
    Ucas,
    Rolling,
    Regular,
}

impl ApplicationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationType::EarlyDecision => "early-decision",
            ApplicationType::EarlyAction => "early-action",
            ApplicationType::Ucas => "ucas",
            ApplicationType::Rolling => "rolling",
            ApplicationType::Regular => "regular",
        }
    }
}

impl FromStr for ApplicationType {
    type Err = ParseFieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "early-decision" => Ok(ApplicationType::EarlyDecision),
            "early-action" => Ok(ApplicationType::EarlyAction),
            "ucas" => Ok(ApplicationType::Ucas),
            "rolling" => Ok(ApplicationType::Rolling),
            "regular" => Ok(ApplicationType::Regular),
            _ => Err(ParseFieldError {
                field: "application type",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStatus {
    NotStarted,
    InProgress,
    Submitted,
    Accepted,
    Rejected,
    Waitlisted,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::NotStarted => "not-started",
            ApplicationStatus::InProgress => "in-progress",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Waitlisted => "waitlisted",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = ParseFieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "not-started" => Ok(ApplicationStatus::NotStarted),
            "in-progress" => Ok(ApplicationStatus::InProgress),
            "submitted" => Ok(ApplicationStatus::Submitted),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "waitlisted" => Ok(ApplicationStatus::Waitlisted),
            _ => Err(ParseFieldError {
                field: "application status",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Essay and recommendation statuses keep the snake_case strings the upstream
// data source stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EssayStatus {
    Draft,
    InProgress,
    Pending,
    Sent,
    Approved,
    Read,
}

impl FromStr for EssayStatus {
    type Err = ParseFieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "draft" => Ok(EssayStatus::Draft),
            "in_progress" => Ok(EssayStatus::InProgress),
            "pending" => Ok(EssayStatus::Pending),
            "sent" => Ok(EssayStatus::Sent),
            "approved" => Ok(EssayStatus::Approved),
            "read" => Ok(EssayStatus::Read),
            _ => Err(ParseFieldError {
                field: "essay status",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Pending,
    InProgress,
    Sent,
}

impl FromStr for RecommendationStatus {
    type Err = ParseFieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(RecommendationStatus::Pending),
            "in_progress" => Ok(RecommendationStatus::InProgress),
            "sent" => Ok(RecommendationStatus::Sent),
            _ => Err(ParseFieldError {
                field: "recommendation status",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApplicationRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub cohort: String,
    pub school_name: String,
    pub app_type: ApplicationType,
    pub deadline: NaiveDate,
    pub status: ApplicationStatus,
    pub essays_required: i32,
    pub essays_completed: i32,
    pub recs_required: i32,
    pub recs_submitted: i32,
    pub urgent: bool,
    pub completion_pct: i32,
    pub ai_score: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct EssayRecord {
    pub student_id: Uuid,
    pub status: EssayStatus,
}

#[derive(Debug, Clone)]
pub struct RecommendationRecord {
    pub student_id: Uuid,
    pub status: RecommendationStatus,
}

/// Deadline-board classification. The reports screen buckets with different
/// boundaries; see [`ReportBucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Overdue,
    Critical,
    Important,
    Upcoming,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Overdue => "overdue",
            Urgency::Critical => "critical",
            Urgency::Important => "important",
            Urgency::Upcoming => "upcoming",
        }
    }
}

/// Reports-screen classification with a 30-day horizon. Kept separate from
/// [`Urgency`]; the two screens do not share boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportBucket {
    Overdue,
    Urgent,
    Upcoming,
    Future,
}

impl ReportBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportBucket::Overdue => "overdue",
            ReportBucket::Urgent => "urgent",
            ReportBucket::Upcoming => "upcoming",
            ReportBucket::Future => "future",
        }
    }

    pub const ALL: [ReportBucket; 4] = [
        ReportBucket::Overdue,
        ReportBucket::Urgent,
        ReportBucket::Upcoming,
        ReportBucket::Future,
    ];
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentSnapshot {
    pub student_id: Uuid,
    pub student_name: String,
    pub essays_done: usize,
    pub essays_total: usize,
    pub recs_done: usize,
    pub recs_total: usize,
    pub progress: i32,
}

/// Applications sharing (school, type, deadline), rebuilt on every fetch.
#[derive(Debug, Clone, Serialize)]
pub struct DeadlineGroup {
    pub school_name: String,
    pub app_type: ApplicationType,
    pub deadline: NaiveDate,
    pub days_left: i64,
    pub urgency: Urgency,
    pub students: Vec<StudentSnapshot>,
}

#[derive(Debug, Clone)]
pub struct BucketSummary {
    pub bucket: ReportBucket,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct WeeklyDeadlineLoad {
    pub week_start: NaiveDate,
    pub application_count: i64,
    pub student_count: i64,
}

/// Field updates for one application. Unset fields carry the current value
/// through unchanged.
#[derive(Debug, Clone, Default)]
pub struct ApplicationPatch {
    pub school_name: Option<String>,
    pub app_type: Option<ApplicationType>,
    pub deadline: Option<NaiveDate>,
    pub status: Option<ApplicationStatus>,
    pub essays_required: Option<i32>,
    pub essays_completed: Option<i32>,
    pub recs_required: Option<i32>,
    pub recs_submitted: Option<i32>,
}

impl ApplicationPatch {
    pub fn is_empty(&self) -> bool {
        self.school_name.is_none()
            && self.app_type.is_none()
            && self.deadline.is_none()
            && self.status.is_none()
            && self.essays_required.is_none()
            && self.essays_completed.is_none()
            && self.recs_required.is_none()
            && self.recs_submitted.is_none()
    }
}

/// Pure transition from the current record plus a patch to the next record.
/// The stored completion percentage is re-derived from the patched counts.
pub fn apply_patch(current: &ApplicationRecord, patch: &ApplicationPatch) -> ApplicationRecord {
    let mut next = current.clone();

    if let Some(school_name) = &patch.school_name {
        next.school_name = school_name.clone();
    }
    if let Some(app_type) = patch.app_type {
        next.app_type = app_type;
    }
    if let Some(deadline) = patch.deadline {
        next.deadline = deadline;
    }
    if let Some(status) = patch.status {
        next.status = status;
    }
    if let Some(essays_required) = patch.essays_required {
        next.essays_required = essays_required;
    }
    if let Some(essays_completed) = patch.essays_completed {
        next.essays_completed = essays_completed;
    }
    if let Some(recs_required) = patch.recs_required {
        next.recs_required = recs_required;
    }
    if let Some(recs_submitted) = patch.recs_submitted {
        next.recs_submitted = recs_submitted;
    }

    next.completion_pct = progress::weighted_completion(
        next.essays_completed,
        next.essays_required,
        next.recs_submitted,
        next.recs_required,
    );
    next
}
