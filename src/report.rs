use std::fmt::Write;

use chrono::NaiveDate;

use crate::analysis::Analysis;
use crate::grading::{compute_result, DEFAULT_MAX_PER_SUBJECT};
use crate::models::{Student, StudentMark};

const COLLEGE_NAME: &str = "Department of Computer Applications";
const BAR_WIDTH: f64 = 40.0;

pub fn build_result_card(student: &Student, marks: &[StudentMark], generated_on: NaiveDate) -> String {
    let scores: Vec<i64> = marks.iter().map(|m| m.score).collect();
    let mut output = String::new();

    let _ = writeln!(output, "# {COLLEGE_NAME}");
    let _ = writeln!(output, "## Result Card: Semester {}", student.semester);
    let _ = writeln!(output);
    let _ = writeln!(output, "- Name: {}", student.name);
    let _ = writeln!(output, "- Roll No: {}", student.roll_no);
    let _ = writeln!(output, "- Semester: {}", student.semester);
    let _ = writeln!(output);

    let Some(summary) = compute_result(&scores, DEFAULT_MAX_PER_SUBJECT) else {
        let _ = writeln!(output, "No marks entered yet.");
        let _ = writeln!(output);
        let _ = writeln!(output, "Generated on {generated_on}");
        return output;
    };

    let _ = writeln!(output, "| Code | Subject | Marks |");
    let _ = writeln!(output, "|------|---------|-------|");
    for mark in marks {
        let _ = writeln!(
            output,
            "| {} | {} | {} |",
            mark.subject_code, mark.subject_name, mark.score
        );
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "- Total: {} / {}", summary.total, summary.max_total);
    let _ = writeln!(output, "- Percentage: {:.2}%", summary.percentage);
    let _ = writeln!(output, "- Grade: {}", summary.grade.label());
    let _ = writeln!(output, "- Status: {}", summary.status.as_str());
    let _ = writeln!(output);
    let _ = writeln!(output, "Generated on {generated_on}");

    output
}

fn bar(percent: f64) -> String {
    "#".repeat((percent / 100.0 * BAR_WIDTH).round() as usize)
}

pub fn build_analysis_report(analysis: &Analysis, generated_on: NaiveDate) -> String {
    let mut output = String::new();
    let overall = &analysis.overall;

    let _ = writeln!(output, "# Result Analysis Dashboard");
    let _ = writeln!(output, "Generated on {generated_on}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall");

    if overall.total_entries == 0 {
        let _ = writeln!(output, "No marks entered yet.");
    } else {
        let _ = writeln!(output, "- Registered students: {}", analysis.registered_students);
        let _ = writeln!(output, "- Students with marks: {}", overall.student_count);
        let _ = writeln!(output, "- Mark entries: {}", overall.total_entries);
        let _ = writeln!(output, "- Average mark: {:.1}", overall.average);
        let _ = writeln!(output, "- Highest mark: {}", overall.max);
        let _ = writeln!(output, "- Lowest mark: {}", overall.min);
        let _ = writeln!(output, "- Pass percentage: {:.1}%", overall.pass_percentage);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");
    let _ = writeln!(output, "| Subject | Entries | Average | Highest | Lowest | Pass Rate |");
    let _ = writeln!(output, "|---------|---------|---------|---------|--------|-----------|");
    for row in &analysis.subjects {
        let _ = writeln!(
            output,
            "| {} {} | {} | {:.1} | {} | {} | {:.1}% |",
            row.code,
            row.name,
            row.stats.count,
            row.stats.average,
            row.stats.max,
            row.stats.min,
            row.stats.pass_rate * 100.0
        );
    }

    let mut averaged: Vec<_> = analysis
        .subjects
        .iter()
        .filter(|row| row.stats.count > 0)
        .collect();
    averaged.sort_by(|a, b| {
        b.stats
            .average
            .partial_cmp(&a.stats.average)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subject Averages");
    if averaged.is_empty() {
        let _ = writeln!(output, "No subject has marks yet.");
    } else {
        for row in averaged {
            let _ = writeln!(
                output,
                "- {:<45} {:>5.1} {}",
                row.name,
                row.stats.average,
                bar(row.stats.average)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Students");
    if analysis.top_students.is_empty() {
        let _ = writeln!(output, "No students with marks yet.");
    } else {
        for (rank, student) in analysis.top_students.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {} ({}) average {:.1}, total {}",
                rank + 1,
                student.name,
                student.roll_no,
                student.average,
                student.total
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Distribution");
    let _ = writeln!(output, "| Band | Count | Share | |");
    let _ = writeln!(output, "|------|-------|-------|-|");
    for bucket in &analysis.distribution {
        let _ = writeln!(
            output,
            "| {} | {} | {:.1}% | {} |",
            bucket.band,
            bucket.count,
            bucket.percent_of_total,
            bar(bucket.percent_of_total)
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarkEntry, Subject};

    fn student() -> Student {
        Student {
            id: 1,
            roll_no: "BCA2024001".to_string(),
            name: "Aarav Sharma".to_string(),
            semester: 5,
            email: None,
            phone: None,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[test]
    fn result_card_shows_grade_and_status() {
        let marks = vec![
            StudentMark {
                subject_code: "0527001".to_string(),
                subject_name: "Java Programming".to_string(),
                score: 95,
            },
            StudentMark {
                subject_code: "0527002".to_string(),
                subject_name: "Computer Networks".to_string(),
                score: 88,
            },
        ];

        let card = build_result_card(&student(), &marks, date());
        assert!(card.contains("| 0527001 | Java Programming | 95 |"));
        assert!(card.contains("Total: 183 / 200"));
        assert!(card.contains("Percentage: 91.50%"));
        assert!(card.contains("Grade: O (Outstanding)"));
        assert!(card.contains("Status: PASS"));
        assert!(card.contains("Generated on 2026-03-14"));
    }

    #[test]
    fn result_card_without_marks_is_not_a_zero_result() {
        let card = build_result_card(&student(), &[], date());
        assert!(card.contains("No marks entered yet."));
        assert!(!card.contains("Percentage"));
        assert!(!card.contains("FAIL"));
    }

    #[test]
    fn analysis_report_lists_every_section() {
        let subjects = vec![Subject {
            id: 1,
            code: "0527001".to_string(),
            name: "Java Programming".to_string(),
            credits: 4,
        }];
        let marks = vec![
            MarkEntry {
                student_id: 1,
                subject_id: 1,
                score: 92,
            },
            MarkEntry {
                student_id: 1,
                subject_id: 1,
                score: 30,
            },
        ];
        let analysis = Analysis::build(&subjects, &[student()], &marks, 5);
        let report = build_analysis_report(&analysis, date());

        assert!(report.contains("- Mark entries: 2"));
        assert!(report.contains("| 0527001 Java Programming | 2 | 61.0 | 92 | 30 | 50.0% |"));
        assert!(report.contains("1. Aarav Sharma (BCA2024001) average 61.0, total 122"));
        assert!(report.contains(&format!("| O (90-100) | 1 | 50.0% | {} |", "#".repeat(20))));
        assert!(report.contains("| F (Below 40) | 1 | 50.0% |"));
    }

    #[test]
    fn subject_averages_are_ranked_highest_first() {
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
            Subject {
                id: 3,
                code: "0527065".to_string(),
                name: "Minor Project".to_string(),
                credits: 4,
            },
        ];
        let marks = vec![
            MarkEntry {
                student_id: 1,
                subject_id: 1,
                score: 50,
            },
            MarkEntry {
                student_id: 1,
                subject_id: 2,
                score: 75,
            },
        ];
        let analysis = Analysis::build(&subjects, &[student()], &marks, 5);
        let report = build_analysis_report(&analysis, date());

        let section = report
            .split("## Subject Averages")
            .nth(1)
            .and_then(|rest| rest.split("## Top Students").next())
            .unwrap();
        let networks = section.find("Computer Networks").unwrap();
        let java = section.find("Java Programming").unwrap();
        assert!(networks < java);
        assert!(!section.contains("Minor Project"));
        assert!(section.contains(&format!(" 75.0 {}", "#".repeat(30))));
        assert!(section.contains(&format!(" 50.0 {}", "#".repeat(20))));
    }

    #[test]
    fn analysis_report_handles_empty_department() {
        let analysis = Analysis::build(&[], &[], &[], 5);
        let report = build_analysis_report(&analysis, date());
        assert!(report.contains("No marks entered yet."));
        assert!(report.contains("No students with marks yet."));
        assert!(report.contains("No subject has marks yet."));
        assert!(report.contains("| C (45-49) | 0 | 0.0% |  |"));
    }
}
