use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

mod analysis;
mod config;
mod db;
mod error;
mod grading;
mod models;
mod report;

use crate::config::Config;
use crate::error::ResultsError;
use crate::models::MarkWrite;

#[derive(Parser)]
#[command(name = "bca-results")]
#[command(about = "Student marks, grades and result analysis for the department", long_about = None)]
struct Cli {
    /// SQLite database URL (overrides DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the semester subjects, optionally with a demo class
    Seed {
        #[arg(long)]
        demo: bool,
    },
    /// Register a student
    AddStudent {
        #[arg(long)]
        roll_no: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = db::DEFAULT_SEMESTER)]
        semester: i64,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Enter or update a student's mark for one subject
    EnterMarks {
        #[arg(long)]
        roll_no: String,
        /// Subject code, e.g. 0527001
        #[arg(long)]
        subject: String,
        #[arg(long, allow_negative_numbers = true)]
        score: i64,
    },
    /// List registered students
    Students,
    /// Find students by name or roll number
    Search {
        #[arg(long)]
        query: String,
    },
    /// Show a student's result, optionally writing a result card
    Result {
        #[arg(long)]
        roll_no: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Department-wide analysis dashboard
    Analysis {
        #[arg(long, default_value_t = 5)]
        top: usize,
        /// Emit JSON instead of markdown
        #[arg(long)]
        json: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Import marks from a CSV file (roll_no,subject_code,score)
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Delete all students and marks
    Reset,
}

fn init_tracing(filter: Option<&str>, quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = match filter {
        Some(directive) => tracing_subscriber::EnvFilter::try_new(directive)
            .with_context(|| format!("invalid RESULTS_LOG directive {directive:?}"))?,
        None => tracing_subscriber::EnvFilter::new(level),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn emit(content: &str, out: Option<&PathBuf>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Written to {}.", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    init_tracing(config.log_filter.as_deref(), cli.quiet, cli.verbose)?;

    let pool = db::connect(&config.database_url, config.max_connections)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { demo } => {
            db::init_db(&pool).await?;
            let subjects = db::seed_subjects(&pool).await?;
            println!("{subjects} subjects ready.");
            if demo {
                let students = db::seed_demo_students(&pool).await?;
                println!("{students} demo students with marks ready.");
            }
        }
        Commands::AddStudent {
            roll_no,
            name,
            semester,
            email,
            phone,
        } => {
            let student = db::add_student(
                &pool,
                roll_no.trim(),
                name.trim(),
                semester,
                email.as_deref(),
                phone.as_deref(),
            )
            .await?;
            println!(
                "Added {} ({}), semester {}.",
                student.name, student.roll_no, student.semester
            );
        }
        Commands::EnterMarks {
            roll_no,
            subject,
            score,
        } => {
            let student = db::find_student_by_roll(&pool, roll_no.trim()).await?;
            let subject = db::find_subject_by_code(&pool, subject.trim()).await?;
            let write = db::upsert_mark(&pool, student.id, subject.id, score).await?;
            let verb = match write {
                MarkWrite::Inserted => "entered",
                MarkWrite::Updated => "updated",
            };
            println!(
                "Marks {verb}: {} scored {score} in {} ({}).",
                student.name, subject.name, subject.code
            );
        }
        Commands::Students => {
            let students = db::list_students(&pool).await?;
            if students.is_empty() {
                println!("No students registered.");
                return Ok(());
            }
            for student in &students {
                println!(
                    "- {} {} (semester {})",
                    student.roll_no, student.name, student.semester
                );
            }
        }
        Commands::Search { query } => {
            let students = db::search_students(&pool, &query).await?;
            if students.is_empty() {
                println!("No students found for '{query}'.");
                return Ok(());
            }
            println!("Found {} student(s) for '{query}':", students.len());
            for student in &students {
                println!("- {} {}", student.roll_no, student.name);
            }
        }
        Commands::Result { roll_no, out } => {
            let student = db::find_student_by_roll(&pool, roll_no.trim()).await?;
            let marks = db::list_marks_for_student(&pool, student.id).await?;
            if marks.is_empty() && out.is_some() {
                return Err(ResultsError::NoData(format!(
                    "{} ({})",
                    student.name, student.roll_no
                ))
                .into());
            }

            let card = report::build_result_card(&student, &marks, Utc::now().date_naive());
            info!(student_id = student.id, subjects = marks.len(), "result card built");
            emit(&card, out.as_ref())?;
        }
        Commands::Analysis { top, json, out } => {
            let subjects = db::list_subjects(&pool).await?;
            let students = db::list_students(&pool).await?;
            let marks = db::list_all_marks(&pool).await?;
            let analysis = analysis::Analysis::build(&subjects, &students, &marks, top);

            let content = if json {
                let mut body = serde_json::to_string_pretty(&analysis)?;
                body.push('\n');
                body
            } else {
                report::build_analysis_report(&analysis, Utc::now().date_naive())
            };
            info!(entries = marks.len(), "analysis built");
            emit(&content, out.as_ref())?;
        }
        Commands::Import { csv } => {
            let summary = db::import_marks_csv(&pool, &csv).await?;
            println!(
                "Imported {} new and {} updated marks from {}.",
                summary.inserted,
                summary.updated,
                csv.display()
            );
        }
        Commands::Reset => {
            let (students, marks) = db::reset(&pool).await?;
            println!("Removed {students} students and {marks} marks.");
        }
    }

    Ok(())
}
