use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::grading::{grade_for, Grade, PASS_THRESHOLD};
use crate::models::{MarkEntry, Student, Subject};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectStatistic {
    pub subject_id: i64,
    pub count: usize,
    pub average: f64,
    pub max: i64,
    pub min: i64,
    pub pass_count: usize,
    /// Fraction in 0.0..=1.0.
    pub pass_rate: f64,
}

impl SubjectStatistic {
    fn empty(subject_id: i64) -> Self {
        Self {
            subject_id,
            count: 0,
            average: 0.0,
            max: 0,
            min: 0,
            pass_count: 0,
            pass_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeBucket {
    pub grade: Grade,
    pub band: &'static str,
    pub count: usize,
    pub percent_of_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopStudent {
    pub student_id: i64,
    pub name: String,
    pub roll_no: String,
    pub average: f64,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverallStatistics {
    pub student_count: usize,
    pub total_entries: usize,
    pub average: f64,
    pub max: i64,
    pub min: i64,
    pub pass_percentage: f64,
}

fn passed(score: i64) -> bool {
    score as f64 >= PASS_THRESHOLD
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

pub fn subject_statistics(marks: &[MarkEntry]) -> BTreeMap<i64, SubjectStatistic> {
    let mut totals: BTreeMap<i64, (SubjectStatistic, i64)> = BTreeMap::new();

    for mark in marks {
        let (stat, sum) = totals.entry(mark.subject_id).or_insert_with(|| {
            let mut stat = SubjectStatistic::empty(mark.subject_id);
            stat.max = mark.score;
            stat.min = mark.score;
            (stat, 0)
        });
        stat.count += 1;
        stat.max = stat.max.max(mark.score);
        stat.min = stat.min.min(mark.score);
        if passed(mark.score) {
            stat.pass_count += 1;
        }
        *sum += mark.score;
    }

    totals
        .into_iter()
        .map(|(subject_id, (mut stat, sum))| {
            stat.average = if stat.count == 0 {
                0.0
            } else {
                sum as f64 / stat.count as f64
            };
            stat.pass_rate = ratio(stat.pass_count, stat.count);
            (subject_id, stat)
        })
        .collect()
}

/// Buckets every mark into the eight bands, best band first.
/// All bands are present, including empty ones.
pub fn grade_distribution(marks: &[MarkEntry]) -> Vec<GradeBucket> {
    let mut counts: HashMap<Grade, usize> = HashMap::new();
    for mark in marks {
        *counts.entry(grade_for(mark.score as f64)).or_insert(0) += 1;
    }

    Grade::ALL
        .iter()
        .map(|grade| {
            let count = counts.get(grade).copied().unwrap_or(0);
            GradeBucket {
                grade: *grade,
                band: grade.band_label(),
                count,
                percent_of_total: ratio(count, marks.len()) * 100.0,
            }
        })
        .collect()
}

/// Ranks students by average mark. Ties keep the order in which students
/// first appear in `marks`. Marks for students missing from `students` are
/// ignored.
pub fn top_students(marks: &[MarkEntry], students: &[Student], n: usize) -> Vec<TopStudent> {
    let by_id: HashMap<i64, &Student> = students.iter().map(|s| (s.id, s)).collect();
    let mut order: HashMap<i64, usize> = HashMap::new();
    let mut groups: Vec<(&Student, i64, usize)> = Vec::new();

    for mark in marks {
        let Some(&student) = by_id.get(&mark.student_id) else {
            continue;
        };
        let index = *order.entry(mark.student_id).or_insert_with(|| {
            groups.push((student, 0, 0));
            groups.len() - 1
        });
        let group = &mut groups[index];
        group.1 += mark.score;
        group.2 += 1;
    }

    let mut ranked: Vec<TopStudent> = groups
        .into_iter()
        .map(|(student, total, count)| TopStudent {
            student_id: student.id,
            name: student.name.clone(),
            roll_no: student.roll_no.clone(),
            average: if count == 0 {
                0.0
            } else {
                total as f64 / count as f64
            },
            total,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.average
            .partial_cmp(&a.average)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(n);
    ranked
}

pub fn overall_statistics(marks: &[MarkEntry]) -> OverallStatistics {
    if marks.is_empty() {
        return OverallStatistics::default();
    }

    let students: HashSet<i64> = marks.iter().map(|m| m.student_id).collect();
    let sum: i64 = marks.iter().map(|m| m.score).sum();
    let pass_count = marks.iter().filter(|m| passed(m.score)).count();

    OverallStatistics {
        student_count: students.len(),
        total_entries: marks.len(),
        average: sum as f64 / marks.len() as f64,
        max: marks.iter().map(|m| m.score).max().unwrap_or(0),
        min: marks.iter().map(|m| m.score).min().unwrap_or(0),
        pass_percentage: ratio(pass_count, marks.len()) * 100.0,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectRow {
    pub code: String,
    pub name: String,
    #[serde(flatten)]
    pub stats: SubjectStatistic,
}

/// Everything the analysis dashboard shows, computed from one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub registered_students: usize,
    pub overall: OverallStatistics,
    pub subjects: Vec<SubjectRow>,
    pub top_students: Vec<TopStudent>,
    pub distribution: Vec<GradeBucket>,
}

impl Analysis {
    pub fn build(
        subjects: &[Subject],
        students: &[Student],
        marks: &[MarkEntry],
        top_n: usize,
    ) -> Self {
        let mut stats = subject_statistics(marks);
        let rows = subjects
            .iter()
            .map(|subject| SubjectRow {
                code: subject.code.clone(),
                name: subject.name.clone(),
                stats: stats
                    .remove(&subject.id)
                    .unwrap_or_else(|| SubjectStatistic::empty(subject.id)),
            })
            .collect();

        Self {
            registered_students: students.len(),
            overall: overall_statistics(marks),
            subjects: rows,
            top_students: top_students(marks, students, top_n),
            distribution: grade_distribution(marks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(student_id: i64, subject_id: i64, score: i64) -> MarkEntry {
        MarkEntry {
            student_id,
            subject_id,
            score,
        }
    }

    fn student(id: i64, name: &str) -> Student {
        Student {
            id,
            roll_no: format!("BCA{id:03}"),
            name: name.to_string(),
            semester: 5,
            email: None,
            phone: None,
        }
    }

    #[test]
    fn subject_statistics_group_by_subject() {
        let marks = vec![mark(1, 1, 80), mark(2, 1, 30), mark(3, 1, 40), mark(1, 2, 55)];
        let stats = subject_statistics(&marks);

        let first = &stats[&1];
        assert_eq!(first.count, 3);
        assert!((first.average - 50.0).abs() < f64::EPSILON);
        assert_eq!(first.max, 80);
        assert_eq!(first.min, 30);
        assert_eq!(first.pass_count, 2);
        assert!((first.pass_rate - 2.0 / 3.0).abs() < 1e-9);

        let second = &stats[&2];
        assert_eq!(second.count, 1);
        assert!((second.pass_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_marks_give_zero_aggregates() {
        assert!(subject_statistics(&[]).is_empty());
        assert_eq!(overall_statistics(&[]), OverallStatistics::default());
        assert!(top_students(&[], &[student(1, "Asha")], 5).is_empty());

        let distribution = grade_distribution(&[]);
        assert_eq!(distribution.len(), 8);
        assert!(distribution.iter().all(|b| b.count == 0 && b.percent_of_total == 0.0));
    }

    #[test]
    fn distribution_uses_fixed_band_order() {
        let marks = vec![
            mark(1, 1, 95),
            mark(1, 2, 44),
            mark(1, 3, 40),
            mark(2, 1, 39),
            mark(2, 2, 47),
            mark(2, 3, 82),
        ];
        let distribution = grade_distribution(&marks);
        let grades: Vec<Grade> = distribution.iter().map(|b| b.grade).collect();
        assert_eq!(grades, Grade::ALL.to_vec());

        let counts: Vec<usize> = distribution.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 0, 0, 0, 1, 2, 1]);
        assert_eq!(distribution[6].band, "P (40-44)");
        assert_eq!(distribution[7].band, "F (Below 40)");

        let sum: f64 = distribution.iter().map(|b| b.percent_of_total).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn top_students_rank_by_average() {
        let students = vec![student(1, "S1"), student(2, "S2"), student(3, "S3")];
        let marks = vec![mark(1, 1, 90), mark(2, 1, 70), mark(3, 1, 80)];

        let ranked = top_students(&marks, &students, 5);
        let names: Vec<&str> = ranked.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["S1", "S3", "S2"]);
    }

    #[test]
    fn top_students_truncates_and_keeps_tie_order() {
        let students = vec![student(1, "A"), student(2, "B"), student(3, "C")];
        let marks = vec![
            mark(2, 1, 60),
            mark(2, 2, 80),
            mark(1, 1, 70),
            mark(3, 1, 50),
        ];

        let ranked = top_students(&marks, &students, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].name, "B");
        assert_eq!(ranked[0].total, 140);
        assert_eq!(ranked[1].name, "A");
    }

    #[test]
    fn top_students_skip_unknown_students() {
        let students = vec![student(1, "Known")];
        let marks = vec![mark(1, 1, 50), mark(9, 1, 99)];
        let ranked = top_students(&marks, &students, 5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].name, "Known");
    }

    #[test]
    fn overall_statistics_cover_all_marks() {
        let marks = vec![mark(1, 1, 90), mark(1, 2, 30), mark(2, 1, 60)];
        let overall = overall_statistics(&marks);
        assert_eq!(overall.student_count, 2);
        assert_eq!(overall.total_entries, 3);
        assert!((overall.average - 60.0).abs() < f64::EPSILON);
        assert_eq!(overall.max, 90);
        assert_eq!(overall.min, 30);
        assert!((overall.pass_percentage - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn analysis_lists_subjects_without_marks() {
        let subjects = vec![
            Subject {
                id: 1,
                code: "0527001".to_string(),
                name: "Java Programming".to_string(),
                credits: 4,
            },
            Subject {
                id: 2,
                code: "0527002".to_string(),
                name: "Computer Networks".to_string(),
                credits: 4,
            },
        ];
        let students = vec![student(1, "Asha"), student(2, "Ravi")];
        let marks = vec![mark(1, 1, 72)];

        let analysis = Analysis::build(&subjects, &students, &marks, 5);
        assert_eq!(analysis.registered_students, 2);
        assert_eq!(analysis.subjects.len(), 2);
        assert_eq!(analysis.subjects[0].stats.count, 1);
        assert_eq!(analysis.subjects[1].stats.count, 0);
        assert_eq!(analysis.subjects[1].stats.pass_rate, 0.0);
        assert_eq!(analysis.top_students.len(), 1);
    }
}
