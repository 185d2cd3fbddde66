use serde::Serialize;

/// Marks available per subject unless a caller says otherwise.
pub const DEFAULT_MAX_PER_SUBJECT: i64 = 100;

/// Minimum percentage (and per-subject mark) that counts as a pass.
/// The lowest passing rung of [`GRADE_LADDER`] is pinned to this value.
pub const PASS_THRESHOLD: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Grade {
    #[serde(rename = "O")]
    Outstanding,
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "P")]
    Pass,
    #[serde(rename = "F")]
    Fail,
}

/// Ordered top-down; the first rung whose floor is met wins.
pub const GRADE_LADDER: [(f64, Grade); 7] = [
    (90.0, Grade::Outstanding),
    (80.0, Grade::APlus),
    (70.0, Grade::A),
    (60.0, Grade::BPlus),
    (50.0, Grade::B),
    (45.0, Grade::C),
    (PASS_THRESHOLD, Grade::Pass),
];

impl Grade {
    /// Every band, best first.
    pub const ALL: [Grade; 8] = [
        Grade::Outstanding,
        Grade::APlus,
        Grade::A,
        Grade::BPlus,
        Grade::B,
        Grade::C,
        Grade::Pass,
        Grade::Fail,
    ];

    /// Label used on result cards, e.g. `A+ (Excellent)`.
    pub fn label(self) -> &'static str {
        match self {
            Grade::Outstanding => "O (Outstanding)",
            Grade::APlus => "A+ (Excellent)",
            Grade::A => "A (Very Good)",
            Grade::BPlus => "B+ (Good)",
            Grade::B => "B (Above Average)",
            Grade::C => "C (Average)",
            Grade::Pass => "P (Pass)",
            Grade::Fail => "F (Fail)",
        }
    }

    /// Label used for mark ranges in the grade distribution.
    pub fn band_label(self) -> &'static str {
        match self {
            Grade::Outstanding => "O (90-100)",
            Grade::APlus => "A+ (80-89)",
            Grade::A => "A (70-79)",
            Grade::BPlus => "B+ (60-69)",
            Grade::B => "B (50-59)",
            Grade::C => "C (45-49)",
            Grade::Pass => "P (40-44)",
            Grade::Fail => "F (Below 40)",
        }
    }
}

pub fn grade_for(percentage: f64) -> Grade {
    GRADE_LADDER
        .iter()
        .find(|(floor, _)| percentage >= *floor)
        .map(|(_, grade)| *grade)
        .unwrap_or(Grade::Fail)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
}

impl Status {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= PASS_THRESHOLD {
            Status::Pass
        } else {
            Status::Fail
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub subjects_counted: usize,
    pub total: i64,
    pub max_total: i64,
    pub percentage: f64,
    pub grade: Grade,
    pub status: Status,
}

/// Grades one student's marks.
///
/// The percentage is taken over the subjects that have entries, not over the
/// full subject list. Returns `None` when no marks have been entered, which
/// callers must treat as "no result yet" rather than a 0% result.
pub fn compute_result(scores: &[i64], max_per_subject: i64) -> Option<ResultSummary> {
    if scores.is_empty() {
        return None;
    }

    let total: i64 = scores.iter().sum();
    let max_total = scores.len() as i64 * max_per_subject;
    let percentage = if max_total > 0 {
        total as f64 / max_total as f64 * 100.0
    } else {
        0.0
    };

    Some(ResultSummary {
        subjects_counted: scores.len(),
        total,
        max_total,
        percentage,
        grade: grade_for(percentage),
        status: Status::from_percentage(percentage),
    })
}
