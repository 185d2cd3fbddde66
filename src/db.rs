use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::error::ResultsError;
use crate::models::{ImportSummary, MarkEntry, MarkWrite, Student, StudentMark, Subject};

pub const DEFAULT_SEMESTER: i64 = 5;
const DEFAULT_CREDITS: i64 = 4;

const SEMESTER_SUBJECTS: [(&str, &str); 6] = [
    ("0527001", "Java Programming"),
    ("0527002", "Computer Networks"),
    ("0527003", "Computer Graphics & Multimedia Applications"),
    ("0527004", "IT Trends & Technologies"),
    ("0527065", "Minor Project"),
    ("0527080", "Java & Computer Graphics Lab"),
];

const DEMO_STUDENTS: [&str; 20] = [
    "Aarav Sharma",
    "Ananya Verma",
    "Rohan Gupta",
    "Priya Singh",
    "Vikram Yadav",
    "Sneha Kumari",
    "Arjun Mishra",
    "Kavya Tiwari",
    "Rahul Pandey",
    "Neha Chauhan",
    "Aditya Srivastava",
    "Pooja Dubey",
    "Karan Mehta",
    "Isha Rawat",
    "Manish Joshi",
    "Simran Kaur",
    "Deepak Saxena",
    "Ritu Agarwal",
    "Sanjay Patel",
    "Geeta Singh",
];

pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, ResultsError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn init_db(pool: &SqlitePool) -> Result<(), ResultsError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed_subjects(pool: &SqlitePool) -> Result<usize, ResultsError> {
    for (code, name) in SEMESTER_SUBJECTS {
        sqlx::query(
            r#"
            INSERT INTO subjects (subject_code, subject_name, credits)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (subject_code) DO UPDATE
            SET subject_name = excluded.subject_name, credits = excluded.credits
            "#,
        )
        .bind(code)
        .bind(name)
        .bind(DEFAULT_CREDITS)
        .execute(pool)
        .await?;
    }

    info!(subjects = SEMESTER_SUBJECTS.len(), "subjects seeded");
    Ok(SEMESTER_SUBJECTS.len())
}

/// Deterministic stand-in for a class's spread of results: top 20% score
/// 85-95, the next 30% 75-84, the next 30% 60-74 and the rest 40-59, each
/// jittered by up to five marks and clamped to 35..=100.
pub fn demo_score(student_index: usize, subject_index: usize) -> i64 {
    let (low, high) = match student_index % 10 + 1 {
        1..=2 => (85, 95),
        3..=5 => (75, 84),
        6..=8 => (60, 74),
        _ => (40, 59),
    };
    let span = (high - low + 1) as usize;
    let base = low + ((student_index * 7 + subject_index * 13) % span) as i64;
    let jitter = ((student_index * 3 + subject_index * 5) % 11) as i64 - 5;
    (base + jitter).clamp(35, 100)
}

pub async fn seed_demo_students(pool: &SqlitePool) -> Result<usize, ResultsError> {
    let subjects = list_subjects(pool).await?;

    for (index, name) in DEMO_STUDENTS.iter().enumerate() {
        let roll_no = format!("BCA2024{:03}", index + 1);
        sqlx::query(
            r#"
            INSERT INTO students (roll_no, name, semester)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (roll_no) DO NOTHING
            "#,
        )
        .bind(&roll_no)
        .bind(*name)
        .bind(DEFAULT_SEMESTER)
        .execute(pool)
        .await?;

        let student = find_student_by_roll(pool, &roll_no).await?;
        for (subject_index, subject) in subjects.iter().enumerate() {
            upsert_mark(pool, student.id, subject.id, demo_score(index, subject_index)).await?;
        }
    }

    info!(
        students = DEMO_STUDENTS.len(),
        subjects = subjects.len(),
        "demo students seeded"
    );
    Ok(DEMO_STUDENTS.len())
}

fn student_from_row(row: &SqliteRow) -> Student {
    Student {
        id: row.get("id"),
        roll_no: row.get("roll_no"),
        name: row.get("name"),
        semester: row.get("semester"),
        email: row.get("email"),
        phone: row.get("phone"),
    }
}

fn subject_from_row(row: &SqliteRow) -> Subject {
    Subject {
        id: row.get("id"),
        code: row.get("subject_code"),
        name: row.get("subject_name"),
        credits: row.get("credits"),
    }
}

pub async fn add_student(
    pool: &SqlitePool,
    roll_no: &str,
    name: &str,
    semester: i64,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<Student, ResultsError> {
    let result = sqlx::query(
        r#"
        INSERT INTO students (roll_no, name, semester, email, phone)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(roll_no)
    .bind(name)
    .bind(semester)
    .bind(email)
    .bind(phone)
    .execute(pool)
    .await;

    match result {
        Ok(done) => {
            info!(student_id = done.last_insert_rowid(), roll_no, "student added");
            find_student(pool, done.last_insert_rowid()).await
        }
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            Err(ResultsError::DuplicateRollNo(roll_no.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn find_student(pool: &SqlitePool, id: i64) -> Result<Student, ResultsError> {
    sqlx::query("SELECT id, roll_no, name, semester, email, phone FROM students WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(|row| student_from_row(&row))
        .ok_or_else(|| ResultsError::StudentNotFound(id.to_string()))
}

pub async fn find_student_by_roll(pool: &SqlitePool, roll_no: &str) -> Result<Student, ResultsError> {
    sqlx::query(
        "SELECT id, roll_no, name, semester, email, phone FROM students WHERE roll_no = ?1",
    )
    .bind(roll_no)
    .fetch_optional(pool)
    .await?
    .map(|row| student_from_row(&row))
    .ok_or_else(|| ResultsError::StudentNotFound(roll_no.to_string()))
}

pub async fn find_subject_by_code(pool: &SqlitePool, code: &str) -> Result<Subject, ResultsError> {
    sqlx::query(
        "SELECT id, subject_code, subject_name, credits FROM subjects WHERE subject_code = ?1",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?
    .map(|row| subject_from_row(&row))
    .ok_or_else(|| ResultsError::SubjectNotFound(code.to_string()))
}

pub async fn list_students(pool: &SqlitePool) -> Result<Vec<Student>, ResultsError> {
    let rows = sqlx::query(
        "SELECT id, roll_no, name, semester, email, phone FROM students ORDER BY name, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(student_from_row).collect())
}

/// Makes `%`, `_` and `\` match literally inside a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub async fn search_students(pool: &SqlitePool, query: &str) -> Result<Vec<Student>, ResultsError> {
    let pattern = format!("%{}%", escape_like(query.trim()));
    let rows = sqlx::query(
        r#"
        SELECT id, roll_no, name, semester, email, phone
        FROM students
        WHERE name LIKE ?1 ESCAPE '\' OR roll_no LIKE ?1 ESCAPE '\'
        ORDER BY name, id
        "#,
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(student_from_row).collect())
}

pub async fn list_subjects(pool: &SqlitePool) -> Result<Vec<Subject>, ResultsError> {
    let rows = sqlx::query(
        "SELECT id, subject_code, subject_name, credits FROM subjects ORDER BY subject_code",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(subject_from_row).collect())
}

pub async fn list_marks_for_student(
    pool: &SqlitePool,
    student_id: i64,
) -> Result<Vec<StudentMark>, ResultsError> {
    let rows = sqlx::query(
        r#"
        SELECT s.subject_code, s.subject_name, m.marks
        FROM marks m
        JOIN subjects s ON s.id = m.subject_id
        WHERE m.student_id = ?1
        ORDER BY s.subject_code
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| StudentMark {
            subject_code: row.get("subject_code"),
            subject_name: row.get("subject_name"),
            score: row.get("marks"),
        })
        .collect())
}

pub async fn list_all_marks(pool: &SqlitePool) -> Result<Vec<MarkEntry>, ResultsError> {
    let rows = sqlx::query("SELECT student_id, subject_id, marks FROM marks ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| MarkEntry {
            student_id: row.get("student_id"),
            subject_id: row.get("subject_id"),
            score: row.get("marks"),
        })
        .collect())
}

fn validate_score(score: i64) -> Result<(), ResultsError> {
    if (0..=100).contains(&score) {
        Ok(())
    } else {
        Err(ResultsError::InvalidScore(score))
    }
}

/// Inserts or replaces the mark for a (student, subject) pair.
///
/// The existence checks and the write share one transaction, and the unique
/// index on `(student_id, subject_id)` keeps a single row per pair even when
/// submissions race.
pub async fn upsert_mark(
    pool: &SqlitePool,
    student_id: i64,
    subject_id: i64,
    score: i64,
) -> Result<MarkWrite, ResultsError> {
    let mut tx = pool.begin().await?;
    let write = upsert_mark_on(&mut *tx, student_id, subject_id, score).await?;
    tx.commit().await?;
    Ok(write)
}

async fn upsert_mark_on(
    conn: &mut SqliteConnection,
    student_id: i64,
    subject_id: i64,
    score: i64,
) -> Result<MarkWrite, ResultsError> {
    validate_score(score)?;

    let student: Option<i64> = sqlx::query_scalar("SELECT id FROM students WHERE id = ?1")
        .bind(student_id)
        .fetch_optional(&mut *conn)
        .await?;
    if student.is_none() {
        return Err(ResultsError::StudentNotFound(student_id.to_string()));
    }

    let subject: Option<i64> = sqlx::query_scalar("SELECT id FROM subjects WHERE id = ?1")
        .bind(subject_id)
        .fetch_optional(&mut *conn)
        .await?;
    if subject.is_none() {
        return Err(ResultsError::SubjectNotFound(subject_id.to_string()));
    }

    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM marks WHERE student_id = ?1 AND subject_id = ?2")
            .bind(student_id)
            .bind(subject_id)
            .fetch_optional(&mut *conn)
            .await?;

    sqlx::query(
        r#"
        INSERT INTO marks (student_id, subject_id, marks)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (student_id, subject_id) DO UPDATE
        SET marks = excluded.marks
        "#,
    )
    .bind(student_id)
    .bind(subject_id)
    .bind(score)
    .execute(&mut *conn)
    .await?;

    let write = if existing.is_some() {
        MarkWrite::Updated
    } else {
        MarkWrite::Inserted
    };
    debug!(student_id, subject_id, score, ?write, "mark stored");
    Ok(write)
}

/// Upserts every row of the file in one transaction. Any bad row (unknown
/// roll number or subject code, out-of-range score, malformed record) rolls
/// back the whole import.
pub async fn import_marks_csv(
    pool: &SqlitePool,
    csv_path: &std::path::Path,
) -> Result<ImportSummary, ResultsError> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        roll_no: String,
        subject_code: String,
        score: i64,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut summary = ImportSummary::default();
    let mut tx = pool.begin().await?;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let roll_no = row.roll_no.trim();
        let subject_code = row.subject_code.trim();

        let student_id: i64 = sqlx::query_scalar("SELECT id FROM students WHERE roll_no = ?1")
            .bind(roll_no)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ResultsError::StudentNotFound(roll_no.to_string()))?;
        let subject_id: i64 =
            sqlx::query_scalar("SELECT id FROM subjects WHERE subject_code = ?1")
                .bind(subject_code)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| ResultsError::SubjectNotFound(subject_code.to_string()))?;

        match upsert_mark_on(&mut *tx, student_id, subject_id, row.score).await? {
            MarkWrite::Inserted => summary.inserted += 1,
            MarkWrite::Updated => summary.updated += 1,
        }
    }

    tx.commit().await?;

    info!(
        inserted = summary.inserted,
        updated = summary.updated,
        path = %csv_path.display(),
        "marks imported"
    );
    Ok(summary)
}

/// Removes every mark and student. Subjects are reference data and stay.
pub async fn reset(pool: &SqlitePool) -> Result<(u64, u64), ResultsError> {
    let mut tx = pool.begin().await?;
    let marks = sqlx::query("DELETE FROM marks").execute(&mut *tx).await?;
    let students = sqlx::query("DELETE FROM students").execute(&mut *tx).await?;
    tx.commit().await?;

    info!(
        marks = marks.rows_affected(),
        students = students.rows_affected(),
        "records reset"
    );
    Ok((students.rows_affected(), marks.rows_affected()))
}
