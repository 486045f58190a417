use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::{
    ApplicationRecord, ApplicationType, DeadlineGroup, EssayRecord, EssayStatus,
    RecommendationRecord, RecommendationStatus, ReportBucket, StudentSnapshot, Urgency,
};
use crate::progress;

pub fn days_left(deadline: NaiveDate, today: NaiveDate) -> i64 {
    (deadline - today).num_days()
}

/// Deadline-board urgency tiers.
pub fn urgency_for(days_left: i64) -> Urgency {
    if days_left < 0 {
        return Urgency::Overdue;
    }
    match days_left {
        0..=7 => Urgency::Critical,
        8..=21 => Urgency::Important,
        _ => Urgency::Upcoming,
    }
}

/// Reports-screen tiers. The 30-day boundary differs from the deadline
/// board's 21; keep both.
pub fn report_bucket_for(days_left: i64) -> ReportBucket {
    if days_left < 0 {
        return ReportBucket::Overdue;
    }
    match days_left {
        0..=7 => ReportBucket::Urgent,
        8..=30 => ReportBucket::Upcoming,
        _ => ReportBucket::Future,
    }
}

/// Groups applications by (school, type, deadline) and attaches one progress
/// snapshot per application, computed from that student's essay and
/// recommendation rows. Pure and deterministic for a fixed `today`; empty
/// input yields an empty list. Groups come back sorted by deadline, then
/// school, then type, so output does not depend on input order.
pub fn build_deadline_groups(
    applications: &[ApplicationRecord],
    essays: &[EssayRecord],
    recommendations: &[RecommendationRecord],
    today: NaiveDate,
) -> Vec<DeadlineGroup> {
    let mut groups: HashMap<(String, ApplicationType, NaiveDate), DeadlineGroup> = HashMap::new();

    for application in applications {
        let key = (
            application.school_name.clone(),
            application.app_type,
            application.deadline,
        );
        let entry = groups.entry(key).or_insert_with(|| {
            let days = days_left(application.deadline, today);
            DeadlineGroup {
                school_name: application.school_name.clone(),
                app_type: application.app_type,
                deadline: application.deadline,
                days_left: days,
                urgency: urgency_for(days),
                students: Vec::new(),
            }
        });
        entry
            .students
            .push(student_snapshot(application, essays, recommendations));
    }

    let mut result: Vec<DeadlineGroup> = groups.into_values().collect();
    result.sort_by(|a, b| {
        a.deadline
            .cmp(&b.deadline)
            .then_with(|| a.school_name.cmp(&b.school_name))
            .then_with(|| a.app_type.as_str().cmp(b.app_type.as_str()))
    });
    result
}

fn student_snapshot(
    application: &ApplicationRecord,
    essays: &[EssayRecord],
    recommendations: &[RecommendationRecord],
) -> StudentSnapshot {
    let student_id = application.student_id;

    let essays_total = essays.iter().filter(|e| e.student_id == student_id).count();
    let essays_done = essays
        .iter()
        .filter(|e| e.student_id == student_id && e.status == EssayStatus::Sent)
        .count();
    let recs_total = recommendations
        .iter()
        .filter(|r| r.student_id == student_id)
        .count();
    let recs_done = recommendations
        .iter()
        .filter(|r| r.student_id == student_id && r.status == RecommendationStatus::Sent)
        .count();

    StudentSnapshot {
        student_id,
        student_name: application.student_name.clone(),
        essays_done,
        essays_total,
        recs_done,
        recs_total,
        progress: progress::combined_progress(essays_done + recs_done, essays_total + recs_total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationStatus;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_application(
        student_id: Uuid,
        name: &str,
        school: &str,
        app_type: ApplicationType,
        deadline: NaiveDate,
    ) -> ApplicationRecord {
        ApplicationRecord {
            id: Uuid::new_v4(),
            student_id,
            student_name: name.to_string(),
            student_email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            cohort: "2026".to_string(),
            school_name: school.to_string(),
            app_type,
            deadline,
            status: ApplicationStatus::InProgress,
            essays_required: 2,
            essays_completed: 1,
            recs_required: 1,
            recs_submitted: 0,
            urgent: false,
            completion_pct: 30,
            ai_score: None,
        }
    }

    fn essay(student_id: Uuid, status: EssayStatus) -> EssayRecord {
        EssayRecord { student_id, status }
    }

    fn recommendation(student_id: Uuid, status: RecommendationStatus) -> RecommendationRecord {
        RecommendationRecord { student_id, status }
    }

    #[test]
    fn urgency_tiers_follow_board_boundaries() {
        assert_eq!(urgency_for(-1), Urgency::Overdue);
        assert_eq!(urgency_for(0), Urgency::Critical);
        assert_eq!(urgency_for(7), Urgency::Critical);
        assert_eq!(urgency_for(8), Urgency::Important);
        assert_eq!(urgency_for(21), Urgency::Important);
        assert_eq!(urgency_for(22), Urgency::Upcoming);
    }

    #[test]
    fn report_buckets_use_thirty_day_horizon() {
        assert_eq!(report_bucket_for(-1), ReportBucket::Overdue);
        assert_eq!(report_bucket_for(0), ReportBucket::Urgent);
        assert_eq!(report_bucket_for(7), ReportBucket::Urgent);
        assert_eq!(report_bucket_for(8), ReportBucket::Upcoming);
        assert_eq!(report_bucket_for(30), ReportBucket::Upcoming);
        assert_eq!(report_bucket_for(31), ReportBucket::Future);
    }

    #[test]
    fn deadline_today_is_critical_with_zero_days() {
        let today = date(2025, 11, 1);
        let student = Uuid::new_v4();
        let applications = vec![sample_application(
            student,
            "Avery Lee",
            "Tufts",
            ApplicationType::EarlyDecision,
            today,
        )];

        let groups = build_deadline_groups(&applications, &[], &[], today);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].days_left, 0);
        assert_eq!(groups[0].urgency, Urgency::Critical);
    }

    #[test]
    fn past_deadline_is_overdue() {
        let today = date(2025, 11, 1);
        let student = Uuid::new_v4();
        let applications = vec![sample_application(
            student,
            "Avery Lee",
            "Tufts",
            ApplicationType::Regular,
            date(2025, 10, 20),
        )];

        let groups = build_deadline_groups(&applications, &[], &[], today);
        assert_eq!(groups[0].urgency, Urgency::Overdue);
        assert_eq!(groups[0].days_left, -12);
    }

    #[test]
    fn week_out_deadline_is_critical() {
        let today = date(2024, 12, 25);
        let student = Uuid::new_v4();
        let applications = vec![sample_application(
            student,
            "Avery Lee",
            "MIT",
            ApplicationType::EarlyAction,
            date(2025, 1, 1),
        )];

        let groups = build_deadline_groups(&applications, &[], &[], today);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].days_left, 7);
        assert_eq!(groups[0].urgency, Urgency::Critical);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let groups = build_deadline_groups(&[], &[], &[], date(2025, 11, 1));
        assert!(groups.is_empty());
    }

    #[test]
    fn shared_key_merges_into_one_group() {
        let today = date(2025, 11, 1);
        let deadline = date(2026, 1, 1);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let applications = vec![
            sample_application(first, "Avery Lee", "Cornell", ApplicationType::Regular, deadline),
            sample_application(second, "Jules Moreno", "Cornell", ApplicationType::Regular, deadline),
        ];

        let groups = build_deadline_groups(&applications, &[], &[], today);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].students.len(), 2);
    }

    #[test]
    fn same_school_different_type_stays_separate() {
        let today = date(2025, 11, 1);
        let deadline = date(2026, 1, 1);
        let student = Uuid::new_v4();
        let applications = vec![
            sample_application(student, "Avery Lee", "Cornell", ApplicationType::Regular, deadline),
            sample_application(student, "Avery Lee", "Cornell", ApplicationType::Rolling, deadline),
        ];

        let groups = build_deadline_groups(&applications, &[], &[], today);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn group_membership_ignores_input_order() {
        let today = date(2025, 11, 1);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let applications = vec![
            sample_application(first, "Avery Lee", "Brown", ApplicationType::Regular, date(2026, 1, 1)),
            sample_application(second, "Jules Moreno", "Brown", ApplicationType::Regular, date(2026, 1, 1)),
            sample_application(first, "Avery Lee", "Amherst", ApplicationType::EarlyDecision, date(2025, 11, 15)),
        ];
        let mut reversed = applications.clone();
        reversed.reverse();

        let forward = build_deadline_groups(&applications, &[], &[], today);
        let backward = build_deadline_groups(&reversed, &[], &[], today);

        assert_eq!(forward.len(), backward.len());
        for (a, b) in forward.iter().zip(backward.iter()) {
            assert_eq!(a.school_name, b.school_name);
            assert_eq!(a.deadline, b.deadline);
            let mut left: Vec<Uuid> = a.students.iter().map(|s| s.student_id).collect();
            let mut right: Vec<Uuid> = b.students.iter().map(|s| s.student_id).collect();
            left.sort();
            right.sort();
            assert_eq!(left, right);
        }
    }

    #[test]
    fn snapshot_counts_sent_work_only() {
        let today = date(2025, 11, 1);
        let student = Uuid::new_v4();
        let applications = vec![sample_application(
            student,
            "Avery Lee",
            "MIT",
            ApplicationType::EarlyAction,
            date(2025, 12, 1),
        )];
        let essays = vec![
            essay(student, EssayStatus::Sent),
            essay(student, EssayStatus::Draft),
            essay(student, EssayStatus::InProgress),
        ];
        let recommendations = vec![recommendation(student, RecommendationStatus::Sent)];

        let groups = build_deadline_groups(&applications, &essays, &recommendations, today);
        let snapshot = &groups[0].students[0];
        assert_eq!(snapshot.essays_done, 1);
        assert_eq!(snapshot.essays_total, 3);
        assert_eq!(snapshot.recs_done, 1);
        assert_eq!(snapshot.recs_total, 1);
        // 2 of 4 combined tasks done
        assert_eq!(snapshot.progress, 50);
    }

    #[test]
    fn snapshots_only_count_the_owning_student() {
        let today = date(2025, 11, 1);
        let student = Uuid::new_v4();
        let other = Uuid::new_v4();
        let applications = vec![sample_application(
            student,
            "Avery Lee",
            "MIT",
            ApplicationType::EarlyAction,
            date(2025, 12, 1),
        )];
        let essays = vec![essay(other, EssayStatus::Sent), essay(student, EssayStatus::Sent)];
        let recommendations = vec![recommendation(other, RecommendationStatus::Sent)];

        let groups = build_deadline_groups(&applications, &essays, &recommendations, today);
        let snapshot = &groups[0].students[0];
        assert_eq!(snapshot.essays_total, 1);
        assert_eq!(snapshot.recs_total, 0);
        assert_eq!(snapshot.progress, 100);
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let today = date(2025, 11, 1);
        let student = Uuid::new_v4();
        let applications = vec![sample_application(
            student,
            "Avery Lee",
            "MIT",
            ApplicationType::EarlyAction,
            date(2025, 12, 1),
        )];
        let essays = vec![essay(student, EssayStatus::Sent), essay(student, EssayStatus::Pending)];

        let first = build_deadline_groups(&applications, &essays, &[], today);
        let second = build_deadline_groups(&applications, &essays, &[], today);
        assert_eq!(first[0].students[0].progress, second[0].students[0].progress);
        assert_eq!(first[0].days_left, second[0].days_left);
    }

    #[test]
    fn groups_sort_by_deadline_then_school() {
        let today = date(2025, 11, 1);
        let student = Uuid::new_v4();
        let applications = vec![
            sample_application(student, "Avery Lee", "Yale", ApplicationType::Regular, date(2026, 1, 2)),
            sample_application(student, "Avery Lee", "Brown", ApplicationType::Regular, date(2026, 1, 2)),
            sample_application(student, "Avery Lee", "Tufts", ApplicationType::EarlyDecision, date(2025, 11, 15)),
        ];

        let groups = build_deadline_groups(&applications, &[], &[], today);
        let order: Vec<&str> = groups.iter().map(|g| g.school_name.as_str()).collect();
        assert_eq!(order, vec!["Tufts", "Brown", "Yale"]);
    }
}
