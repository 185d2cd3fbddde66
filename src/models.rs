use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Student {
    pub id: i64,
    pub roll_no: String,
    pub name: String,
    pub semester: i64,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub credits: i64,
}

/// One stored mark, as read for department-wide aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkEntry {
    pub student_id: i64,
    pub subject_id: i64,
    pub score: i64,
}

/// One stored mark joined with its subject, as shown on a result card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentMark {
    pub subject_code: String,
    pub subject_name: String,
    pub score: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkWrite {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
}
