use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod db;
mod deadlines;
mod models;
mod progress;
mod report;

use models::{ApplicationPatch, ApplicationStatus, ApplicationType, Urgency};

#[derive(Parser)]
#[command(name = "deadline-tracker")]
#[command(about = "Application deadline and progress tracker for CounselDesk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import applications from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show deadline groups across the roster
    #[command(group(
        ArgGroup::new("scope")
            .args(["cohort", "email"])
            .multiple(false)
    ))]
    Deadlines {
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Show per-application completion and urgency
    #[command(group(
        ArgGroup::new("scope")
            .args(["cohort", "email"])
            .multiple(false)
    ))]
    Status {
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Update fields on one application
    Update {
        #[arg(long)]
        application: Uuid,
        #[arg(long)]
        school: Option<String>,
        #[arg(long)]
        app_type: Option<ApplicationType>,
        #[arg(long)]
        deadline: Option<NaiveDate>,
        #[arg(long)]
        status: Option<ApplicationStatus>,
        #[arg(long)]
        essays_required: Option<i32>,
        #[arg(long)]
        essays_completed: Option<i32>,
        #[arg(long)]
        recs_required: Option<i32>,
        #[arg(long)]
        recs_submitted: Option<i32>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Recompute stored completion percentages and urgent flags
    Refresh {
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Generate a markdown report
    #[command(group(
        ArgGroup::new("scope")
            .args(["cohort", "email"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn resolve_as_of(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| Utc::now().date_naive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let (inserted, skipped) = db::import_csv(&pool, &csv).await?;
            println!(
                "Inserted {inserted} applications from {} ({skipped} rows skipped).",
                csv.display()
            );
        }
        Commands::Deadlines {
            cohort,
            email,
            as_of,
            limit,
            json,
        } => {
            let today = resolve_as_of(as_of);
            let applications =
                db::fetch_applications(&pool, cohort.as_deref(), email.as_deref()).await?;
            let essays = db::fetch_essays(&pool, cohort.as_deref(), email.as_deref()).await?;
            let recommendations =
                db::fetch_recommendations(&pool, cohort.as_deref(), email.as_deref()).await?;
            let groups =
                deadlines::build_deadline_groups(&applications, &essays, &recommendations, today);

            if groups.is_empty() {
                println!("No deadlines found.");
                return Ok(());
            }

            let shown: Vec<_> = groups.iter().take(limit).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
                return Ok(());
            }

            println!("Upcoming deadlines:");
            for group in shown {
                println!(
                    "- {} {} due {} ({}, {} days left)",
                    group.school_name,
                    group.app_type,
                    group.deadline,
                    group.urgency.as_str(),
                    group.days_left
                );
                for student in group.students.iter() {
                    println!(
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
        Commands::Status {
            cohort,
            email,
            as_of,
        } => {
            let today = resolve_as_of(as_of);
            let applications =
                db::fetch_applications(&pool, cohort.as_deref(), email.as_deref()).await?;

            if applications.is_empty() {
                println!("No applications on file.");
                return Ok(());
            }

            println!("Applications by deadline:");
            for application in applications.iter() {
                let days = deadlines::days_left(application.deadline, today);
                let completion = progress::weighted_completion(
                    application.essays_completed,
                    application.essays_required,
                    application.recs_submitted,
                    application.recs_required,
                );
                let ai_note = application
                    .ai_score
                    .map(|score| format!(", ai {score:.0}"))
                    .unwrap_or_default();
                println!(
                    "- {} ({}, {}) {} {} due {}: {}% complete, {}, {}{}",
                    application.student_name,
                    application.student_email,
                    application.cohort,
                    application.school_name,
                    application.app_type,
                    application.deadline,
                    completion,
                    application.status,
                    deadlines::urgency_for(days).as_str(),
                    ai_note
                );
            }
        }
        Commands::Update {
            application,
            school,
            app_type,
            deadline,
            status,
            essays_required,
            essays_completed,
            recs_required,
            recs_submitted,
            as_of,
        } => {
            let patch = ApplicationPatch {
                school_name: school,
                app_type,
                deadline,
                status,
                essays_required,
                essays_completed,
                recs_required,
                recs_submitted,
            };
            if patch.is_empty() {
                println!("Nothing to update.");
                return Ok(());
            }

            let today = resolve_as_of(as_of);
            let current = db::get_application(&pool, application).await?;
            let mut next = models::apply_patch(&current, &patch);
            let days = deadlines::days_left(next.deadline, today);
            next.urgent = matches!(
                deadlines::urgency_for(days),
                Urgency::Overdue | Urgency::Critical
            );
            db::update_application(&pool, &next).await?;

            println!(
                "Updated {} {} for {} ({}% complete).",
                next.school_name, next.app_type, next.student_name, next.completion_pct
            );
        }
        Commands::Refresh { as_of } => {
            let today = resolve_as_of(as_of);
            let updated = db::refresh_rollups(&pool, today).await?;
            println!("Recomputed rollups; {updated} applications changed.");
        }
        Commands::Report {
            cohort,
            email,
            as_of,
            out,
        } => {
            let today = resolve_as_of(as_of);
            let applications =
                db::fetch_applications(&pool, cohort.as_deref(), email.as_deref()).await?;
            let essays = db::fetch_essays(&pool, cohort.as_deref(), email.as_deref()).await?;
            let recommendations =
                db::fetch_recommendations(&pool, cohort.as_deref(), email.as_deref()).await?;
            let weekly_load = db::fetch_weekly_deadline_load(
                &pool,
                today,
                cohort.as_deref(),
                email.as_deref(),
            )
            .await?;
            let report = report::build_report(
                cohort.as_deref().or(email.as_deref()),
                today,
                &applications,
                &essays,
                &recommendations,
                &weekly_load,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
