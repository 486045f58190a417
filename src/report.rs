use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{
    ApplicationRecord, BucketSummary, EssayRecord, RecommendationRecord, WeeklyDeadlineLoad,
};
use crate::{deadlines, progress};

/// Application counts per report bucket, in fixed overdue-to-future order.
pub fn summarize_buckets(
    applications: &[ApplicationRecord],
    as_of: NaiveDate,
) -> Vec<BucketSummary> {
    crate::models::ReportBucket::ALL
        .iter()
        .map(|bucket| BucketSummary {
            bucket: *bucket,
            count: applications
                .iter()
                .filter(|a| {
                    deadlines::report_bucket_for(deadlines::days_left(a.deadline, as_of)) == *bucket
                })
                .count(),
        })
        .collect()
}

pub fn build_report(
    scope: Option<&str>,
    as_of: NaiveDate,
    applications: &[ApplicationRecord],
    essays: &[EssayRecord],
    recommendations: &[RecommendationRecord],
    weekly_load: &[WeeklyDeadlineLoad],
) -> String {
    let groups = deadlines::build_deadline_groups(applications, essays, recommendations, as_of);
    let buckets = summarize_buckets(applications, as_of);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all students");

    let _ = writeln!(output, "# Application Deadline Report");
    let _ = writeln!(output, "Generated for {} (as of {})", scope_label, as_of);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Deadline Outlook");

    if applications.is_empty() {
        let _ = writeln!(output, "No applications on file for this scope.");
    } else {
        for summary in buckets.iter() {
            let _ = writeln!(
                output,
                "- {}: {} applications",
                summary.bucket.as_str(),
                summary.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Deadline Board");

    if groups.is_empty() {
        let _ = writeln!(output, "No deadlines found.");
    } else {
        for group in groups.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} {} due {} ({}, {} days left)",
                group.school_name,
                group.app_type,
                group.deadline,
                group.urgency.as_str(),
                group.days_left
            );
            for student in group.students.iter() {
                let _ = writeln!(
                    output,
                    "  - {}: essays {}/{}, recs {}/{}, {}% ready",
                    student.student_name,
                    student.essays_done,
                    student.essays_total,
                    student.recs_done,
                    student.recs_total,
                    student.progress
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Deadline Load");

    if weekly_load.is_empty() {
        let _ = writeln!(output, "No upcoming deadlines on the calendar.");
    } else {
        for week in weekly_load.iter() {
            let _ = writeln!(
                output,
                "- week of {}: {} applications across {} students",
                week.week_start, week.application_count, week.student_count
            );
        }
    }

    let mut behind: Vec<&ApplicationRecord> = applications
        .iter()
        .filter(|a| {
            let days = deadlines::days_left(a.deadline, as_of);
            let completion = progress::weighted_completion(
                a.essays_completed,
                a.essays_required,
                a.recs_submitted,
                a.recs_required,
            );
            days <= 30 && completion < 50
        })
        .collect();
    behind.sort_by_key(|a| a.deadline);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students Behind Pace");

    if behind.is_empty() {
        let _ = writeln!(output, "Everyone is on pace for the next 30 days.");
    } else {
        for application in behind.iter() {
            let completion = progress::weighted_completion(
                application.essays_completed,
                application.essays_required,
                application.recs_submitted,
                application.recs_required,
            );
            let _ = writeln!(
                output,
                "- {} ({}) {} {} due {}: {}% complete",
                application.student_name,
                application.student_email,
                application.school_name,
                application.app_type,
                application.deadline,
                completion
            );
        }
    }

    output
}
