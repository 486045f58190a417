use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{ApplicationRecord, EssayRecord, RecommendationRecord, WeeklyDeadlineLoad};
use crate::{deadlines, progress};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("8c8f34a1-54bb-4c6f-9c1e-2f5a1d6a9e01")?,
            "Avery Lee",
            "avery.lee@counseldesk.app",
            "2026",
        ),
        (
            Uuid::parse_str("4b2e6a30-7a33-4b54-8f6e-9d0c2a1b7e02")?,
            "Jules Moreno",
            "jules.moreno@counseldesk.app",
            "2025",
        ),
        (
            Uuid::parse_str("e1a9c7d2-0b44-4f61-a2d3-5c8e4f7b9a03")?,
            "Kiara Patel",
            "kiara.patel@counseldesk.app",
            "2026",
        ),
    ];

    for (id, name, email, cohort) in students {
        sqlx::query(
            r#"
            INSERT INTO deadline_tracker.students (id, full_name, email, cohort)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, cohort = EXCLUDED.cohort
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(cohort)
        .fetch_one(pool)
        .await?;
    }

    let applications = vec![
        (
            "seed-app-001",
            "avery.lee@counseldesk.app",
            "MIT",
            "early-action",
            NaiveDate::from_ymd_opt(2025, 11, 1).context("invalid date")?,
            "in-progress",
            3,
            1,
            2,
            1,
        ),
        (
            "seed-app-002",
            "avery.lee@counseldesk.app",
            "Cornell",
            "regular",
            NaiveDate::from_ymd_opt(2026, 1, 2).context("invalid date")?,
            "not-started",
            4,
            0,
            2,
            0,
        ),
        (
            "seed-app-003",
            "jules.moreno@counseldesk.app",
            "MIT",
            "early-action",
            NaiveDate::from_ymd_opt(2025, 11, 1).context("invalid date")?,
            "in-progress",
            3,
            2,
            2,
            2,
        ),
        (
            "seed-app-004",
            "kiara.patel@counseldesk.app",
            "St Andrews",
            "ucas",
            NaiveDate::from_ymd_opt(2026, 1, 29).context("invalid date")?,
            "in-progress",
            1,
            1,
            1,
            0,
        ),
    ];

    for (
        source_key,
        email,
        school,
        app_type,
        deadline,
        status,
        essays_required,
        essays_completed,
        recs_required,
        recs_submitted,
    ) in applications
    {
        let student_id: Uuid =
            sqlx::query("SELECT id FROM deadline_tracker.students WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?
                .get("id");

        let completion_pct = progress::weighted_completion(
            essays_completed,
            essays_required,
            recs_submitted,
            recs_required,
        );

        sqlx::query(
            r#"
            INSERT INTO deadline_tracker.applications
            (id, student_id, school_name, app_type, deadline, status,
             essays_required, essays_completed, recs_required, recs_submitted,
             urgent, completion_pct, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, $11, $12)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(school)
        .bind(app_type)
        .bind(deadline)
        .bind(status)
        .bind(essays_required)
        .bind(essays_completed)
        .bind(recs_required)
        .bind(recs_submitted)
        .bind(completion_pct)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let essays = vec![
        (
            Uuid::parse_str("11d3b7a0-61c2-4c1f-b6a4-0f9e8d7c6a10")?,
            "avery.lee@counseldesk.app",
            "Personal statement",
            "sent",
        ),
        (
            Uuid::parse_str("22e4c8b1-72d3-4d20-a7b5-1a0f9e8d7b21")?,
            "avery.lee@counseldesk.app",
            "Why MIT",
            "in_progress",
        ),
        (
            Uuid::parse_str("33f5d9c2-83e4-4e31-b8c6-2b1a0f9e8c32")?,
            "jules.moreno@counseldesk.app",
            "Personal statement",
            "approved",
        ),
        (
            Uuid::parse_str("44a6ead3-94f5-4f42-99d7-3c2b1a0f9d43")?,
            "kiara.patel@counseldesk.app",
            "UCAS personal statement",
            "sent",
        ),
    ];

    for (id, email, title, status) in essays {
        let student_id: Uuid =
            sqlx::query("SELECT id FROM deadline_tracker.students WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?
                .get("id");

        sqlx::query(
            r#"
            INSERT INTO deadline_tracker.essays (id, student_id, title, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(student_id)
        .bind(title)
        .bind(status)
        .execute(pool)
        .await?;
    }

    let recommendations = vec![
        (
            Uuid::parse_str("55b7fbe4-a506-4053-8ae8-4d3c2b1a0e54")?,
            "avery.lee@counseldesk.app",
            "Ms. Alvarez",
            "sent",
        ),
        (
            Uuid::parse_str("66c80cf5-b617-4164-9bf9-5e4d3c2b1f65")?,
            "avery.lee@counseldesk.app",
            "Mr. Chen",
            "pending",
        ),
        (
            Uuid::parse_str("77d91d06-c728-4275-8c0a-6f5e4d3c2a76")?,
            "jules.moreno@counseldesk.app",
            "Dr. Osei",
            "sent",
        ),
    ];

    for (id, email, recommender, status) in recommendations {
        let student_id: Uuid =
            sqlx::query("SELECT id FROM deadline_tracker.students WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?
                .get("id");

        sqlx::query(
            r#"
            INSERT INTO deadline_tracker.recommendations (id, student_id, recommender, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(student_id)
        .bind(recommender)
        .bind(status)
        .execute(pool)
        .await?;
    }

    Ok(())
}

fn application_from_row(row: &PgRow) -> anyhow::Result<ApplicationRecord> {
    let app_type: String = row.get("app_type");
    let status: String = row.get("status");

    Ok(ApplicationRecord {
        id: row.get("id"),
        student_id: row.get("student_id"),
        student_name: row.get("full_name"),
        student_email: row.get("email"),
        cohort: row.get("cohort"),
        school_name: row.get("school_name"),
        app_type: app_type.parse()?,
        deadline: row.get("deadline"),
        status: status.parse()?,
        essays_required: row.get("essays_required"),
        essays_completed: row.get("essays_completed"),
        recs_required: row.get("recs_required"),
        recs_submitted: row.get("recs_submitted"),
        urgent: row.get("urgent"),
        completion_pct: row.get("completion_pct"),
        ai_score: row.get("ai_score"),
    })
}

pub async fn fetch_applications(
    pool: &PgPool,
    cohort: Option<&str>,
    email: Option<&str>,
) -> anyhow::Result<Vec<ApplicationRecord>> {
    let mut query = String::from(
        "SELECT a.id, a.student_id, s.full_name, s.email, s.cohort, \
         a.school_name, a.app_type, a.deadline, a.status, \
         a.essays_required, a.essays_completed, a.recs_required, a.recs_submitted, \
         a.urgent, a.completion_pct, a.ai_score \
         FROM deadline_tracker.applications a \
         JOIN deadline_tracker.students s ON s.id = a.student_id",
    );

    if cohort.is_some() {
        query.push_str(" WHERE s.cohort = $1");
    } else if email.is_some() {
        query.push_str(" WHERE s.email = $1");
    }
    query.push_str(" ORDER BY a.deadline, a.school_name");

    let mut rows = sqlx::query(&query);
    if let Some(value) = cohort {
        rows = rows.bind(value);
    } else if let Some(value) = email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut applications = Vec::new();
    for row in records {
        applications.push(application_from_row(&row)?);
    }

    Ok(applications)
}

pub async fn fetch_essays(
    pool: &PgPool,
    cohort: Option<&str>,
    email: Option<&str>,
) -> anyhow::Result<Vec<EssayRecord>> {
    let mut query = String::from(
        "SELECT e.student_id, e.status \
         FROM deadline_tracker.essays e \
         JOIN deadline_tracker.students s ON s.id = e.student_id",
    );

    if cohort.is_some() {
        query.push_str(" WHERE s.cohort = $1");
    } else if email.is_some() {
        query.push_str(" WHERE s.email = $1");
    }

    let mut rows = sqlx::query(&query);
    if let Some(value) = cohort {
        rows = rows.bind(value);
    } else if let Some(value) = email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut essays = Vec::new();
    for row in records {
        let status: String = row.get("status");
        essays.push(EssayRecord {
            student_id: row.get("student_id"),
            status: status.parse()?,
        });
    }

    Ok(essays)
}

pub async fn fetch_recommendations(
    pool: &PgPool,
    cohort: Option<&str>,
    email: Option<&str>,
) -> anyhow::Result<Vec<RecommendationRecord>> {
    let mut query = String::from(
        "SELECT r.student_id, r.status \
         FROM deadline_tracker.recommendations r \
         JOIN deadline_tracker.students s ON s.id = r.student_id",
    );

    if cohort.is_some() {
        query.push_str(" WHERE s.cohort = $1");
    } else if email.is_some() {
        query.push_str(" WHERE s.email = $1");
    }

    let mut rows = sqlx::query(&query);
    if let Some(value) = cohort {
        rows = rows.bind(value);
    } else if let Some(value) = email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut recommendations = Vec::new();
    for row in records {
        let status: String = row.get("status");
        recommendations.push(RecommendationRecord {
            student_id: row.get("student_id"),
            status: status.parse()?,
        });
    }

    Ok(recommendations)
}

pub async fn fetch_weekly_deadline_load(
    pool: &PgPool,
    from: NaiveDate,
    cohort: Option<&str>,
    email: Option<&str>,
) -> anyhow::Result<Vec<WeeklyDeadlineLoad>> {
    let mut query = String::from(
        "SELECT date_trunc('week', a.deadline)::date AS week_start, \
         COUNT(*) AS application_count, \
         COUNT(DISTINCT a.student_id) AS student_count \
         FROM deadline_tracker.applications a \
         JOIN deadline_tracker.students s ON s.id = a.student_id \
         WHERE a.deadline >= $1",
    );

    if cohort.is_some() {
        query.push_str(" AND s.cohort = $2");
    } else if email.is_some() {
        query.push_str(" AND s.email = $2");
    }
    query.push_str(" GROUP BY week_start ORDER BY week_start");

    let mut rows = sqlx::query(&query).bind(from);
    if let Some(value) = cohort {
        rows = rows.bind(value);
    } else if let Some(value) = email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut load = Vec::new();
    for row in records {
        load.push(WeeklyDeadlineLoad {
            week_start: row.get("week_start"),
            application_count: row.get("application_count"),
            student_count: row.get("student_count"),
        });
    }

    Ok(load)
}

pub async fn get_application(pool: &PgPool, id: Uuid) -> anyhow::Result<ApplicationRecord> {
    let row = sqlx::query(
        "SELECT a.id, a.student_id, s.full_name, s.email, s.cohort, \
         a.school_name, a.app_type, a.deadline, a.status, \
         a.essays_required, a.essays_completed, a.recs_required, a.recs_submitted, \
         a.urgent, a.completion_pct, a.ai_score \
         FROM deadline_tracker.applications a \
         JOIN deadline_tracker.students s ON s.id = a.student_id \
         WHERE a.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no application with id {id}"))?;

    application_from_row(&row)
}

pub async fn update_application(pool: &PgPool, record: &ApplicationRecord) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE deadline_tracker.applications
        SET school_name = $2, app_type = $3, deadline = $4, status = $5,
            essays_required = $6, essays_completed = $7,
            recs_required = $8, recs_submitted = $9,
            urgent = $10, completion_pct = $11
        WHERE id = $1
        "#,
    )
    .bind(record.id)
    .bind(&record.school_name)
    .bind(record.app_type.as_str())
    .bind(record.deadline)
    .bind(record.status.as_str())
    .bind(record.essays_required)
    .bind(record.essays_completed)
    .bind(record.recs_required)
    .bind(record.recs_submitted)
    .bind(record.urgent)
    .bind(record.completion_pct)
    .execute(pool)
    .await?;

    Ok(())
}

/// Recomputes each application's stored completion percentage and urgent
/// flag, writing back only rows whose values changed. Returns the number of
/// rows updated.
pub async fn refresh_rollups(pool: &PgPool, today: NaiveDate) -> anyhow::Result<u64> {
    let applications = fetch_applications(pool, None, None).await?;
    let mut updated = 0u64;

    for application in applications {
        let completion_pct = progress::weighted_completion(
            application.essays_completed,
            application.essays_required,
            application.recs_submitted,
            application.recs_required,
        );
        let days = deadlines::days_left(application.deadline, today);
        let urgent = matches!(
            deadlines::urgency_for(days),
            crate::models::Urgency::Overdue | crate::models::Urgency::Critical
        );

        if completion_pct == application.completion_pct && urgent == application.urgent {
            continue;
        }

        sqlx::query(
            "UPDATE deadline_tracker.applications \
             SET completion_pct = $2, urgent = $3 WHERE id = $1",
        )
        .bind(application.id)
        .bind(completion_pct)
        .bind(urgent)
        .execute(pool)
        .await?;
        updated += 1;
    }

    Ok(updated)
}

pub async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<(usize, usize)> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        cohort: String,
        school_name: String,
        app_type: String,
        deadline: String,
        status: String,
        essays_required: i32,
        essays_completed: i32,
        recs_required: i32,
        recs_submitted: i32,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;
    let mut skipped = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row_number = index + 1;
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!("row {row_number}: unreadable record, skipping: {err}");
                skipped += 1;
                continue;
            }
        };

        // Malformed rows are dropped one at a time; the rest of the file
        // still imports.
        let deadline = match NaiveDate::parse_from_str(&row.deadline, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                tracing::warn!(
                    "row {row_number}: invalid deadline date {:?}, skipping",
                    row.deadline
                );
                skipped += 1;
                continue;
            }
        };
        let app_type = match row.app_type.parse::<crate::models::ApplicationType>() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("row {row_number}: {err}, skipping");
                skipped += 1;
                continue;
            }
        };
        let status = match row.status.parse::<crate::models::ApplicationStatus>() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("row {row_number}: {err}, skipping");
                skipped += 1;
                continue;
            }
        };

        let student_id: Uuid = sqlx::query(
            r#"
            INSERT INTO deadline_tracker.students (id, full_name, email, cohort)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, cohort = EXCLUDED.cohort
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.full_name)
        .bind(&row.email)
        .bind(&row.cohort)
        .fetch_one(pool)
        .await?
        .get("id");

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        let completion_pct = progress::weighted_completion(
            row.essays_completed,
            row.essays_required,
            row.recs_submitted,
            row.recs_required,
        );

        let result = sqlx::query(
            r#"
            INSERT INTO deadline_tracker.applications
            (id, student_id, school_name, app_type, deadline, status,
             essays_required, essays_completed, recs_required, recs_submitted,
             urgent, completion_pct, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, $11, $12)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(&row.school_name)
        .bind(app_type.as_str())
        .bind(deadline)
        .bind(status.as_str())
        .bind(row.essays_required)
        .bind(row.essays_completed)
        .bind(row.recs_required)
        .bind(row.recs_submitted)
        .bind(completion_pct)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok((inserted, skipped))
}
