use crate::model::{EnrollmentRecord, EnrollmentView, Student, Subject, Teacher};
use std::collections::HashMap;

/// Display value for a foreign id with no match in its reference list.
pub const PLACEHOLDER: &str = "–";

/// Joins raw enrollment rows against the three reference lists.
///
/// Output has one row per record, in input order. An unmatched id is not an
/// error: the corresponding name becomes [`PLACEHOLDER`], as does a
/// matched entry whose name is empty.
pub fn resolve(
    records: &[EnrollmentRecord],
    students: &[Student],
    subjects: &[Subject],
    teachers: &[Teacher],
) -> Vec<EnrollmentView> {
    let student_names: HashMap<&str, &str> = students
        .iter()
        .map(|s| (s.id.as_str(), s.first_names.as_str()))
        .collect();
    let subject_names: HashMap<&str, &str> = subjects
        .iter()
        .map(|m| (m.id.as_str(), m.name.as_str()))
        .collect();
    let teacher_names: HashMap<&str, String> = teachers
        .iter()
        .map(|d| (d.id.as_str(), d.full_name()))
        .collect();

    let mut unmatched = 0usize;
    let mut lookup = |found: Option<&str>| -> String {
        match found {
            Some("") => PLACEHOLDER.to_string(),
            Some(v) => v.to_string(),
            None => {
                unmatched += 1;
                PLACEHOLDER.to_string()
            }
        }
    };

    let views: Vec<EnrollmentView> = records
        .iter()
        .map(|r| {
            let student_name = lookup(student_names.get(r.student_id.as_str()).copied());
            let subject_name = lookup(subject_names.get(r.subject_id.as_str()).copied());
            let teacher_full_name =
                lookup(teacher_names.get(r.teacher_id.as_str()).map(|s| s.as_str()));
            let (teacher_first_names, teacher_last_names) = split_full_name(&teacher_full_name);
            EnrollmentView {
                id: r.id.clone(),
                student_name,
                subject_name,
                teacher_first_names,
                teacher_last_names,
                teacher_full_name,
                period: r.period.clone(),
                grade: r.grade,
            }
        })
        .collect();

    if unmatched > 0 {
        tracing::warn!(
            unmatched,
            records = records.len(),
            "enrollment rows reference unknown students, subjects or teachers"
        );
    }
    views
}

/// First word, then the rest. The placeholder splits into itself and "".
fn split_full_name(full: &str) -> (String, String) {
    match full.split_once(' ') {
        Some((first, rest)) => (first.to_string(), rest.to_string()),
        None => (full.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, student: &str, subject: &str, teacher: &str) -> EnrollmentRecord {
        EnrollmentRecord {
            id: id.into(),
            student_id: student.into(),
            subject_id: subject.into(),
            teacher_id: teacher.into(),
            period: "2024-1".into(),
            grade: 8.5,
        }
    }

    fn student(id: &str, name: &str) -> Student {
        Student {
            id: id.into(),
            first_names: name.into(),
            ..Student::default()
        }
    }

    fn subject(id: &str, name: &str) -> Subject {
        Subject {
            id: id.into(),
            name: name.into(),
        }
    }

    fn teacher(id: &str, first: &str, last: &str) -> Teacher {
        Teacher {
            id: id.into(),
            first_names: first.into(),
            last_names: last.into(),
            ..Teacher::default()
        }
    }

    #[test]
    fn joins_single_record() {
        let out = resolve(
            &[record("e1", "s1", "m1", "d1")],
            &[student("s1", "Ana")],
            &[subject("m1", "Matemáticas")],
            &[teacher("d1", "Luis", "Pérez")],
        );
        assert_eq!(
            out,
            vec![EnrollmentView {
                id: "e1".into(),
                student_name: "Ana".into(),
                subject_name: "Matemáticas".into(),
                teacher_first_names: "Luis".into(),
                teacher_last_names: "Pérez".into(),
                teacher_full_name: "Luis Pérez".into(),
                period: "2024-1".into(),
                grade: 8.5,
            }]
        );
    }

    #[test]
    fn unmatched_ids_use_placeholder() {
        let out = resolve(
            &[record("e1", "nope", "nope", "nope")],
            &[student("s1", "Ana")],
            &[],
            &[teacher("d1", "Luis", "Pérez")],
        );
        assert_eq!(out[0].student_name, PLACEHOLDER);
        assert_eq!(out[0].subject_name, PLACEHOLDER);
        assert_eq!(out[0].teacher_full_name, PLACEHOLDER);
        assert_eq!(out[0].teacher_first_names, PLACEHOLDER);
        assert_eq!(out[0].teacher_last_names, "");
    }

    #[test]
    fn blank_matched_names_use_placeholder() {
        let out = resolve(
            &[record("e1", "s1", "m1", "d1")],
            &[student("s1", "")],
            &[subject("m1", "")],
            &[teacher("d1", "Luis", "Pérez")],
        );
        assert_eq!(out[0].student_name, PLACEHOLDER);
        assert_eq!(out[0].subject_name, PLACEHOLDER);
        assert_eq!(out[0].teacher_full_name, "Luis Pérez");
    }

    #[test]
    fn keeps_order_and_duplicates() {
        let records = vec![
            record("e3", "s1", "m1", "d1"),
            record("e1", "s2", "m1", "d1"),
            record("e3", "s1", "m1", "d1"),
        ];
        let out = resolve(
            &records,
            &[student("s1", "Ana"), student("s2", "Bruno")],
            &[subject("m1", "Física")],
            &[teacher("d1", "Luis", "Pérez")],
        );
        assert_eq!(out.len(), records.len());
        let ids: Vec<&str> = out.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["e3", "e1", "e3"]);
        assert_eq!(out[1].student_name, "Bruno");
    }

    #[test]
    fn compound_first_names_shift_into_last_names() {
        let out = resolve(
            &[record("e1", "s1", "m1", "d1")],
            &[],
            &[],
            &[teacher("d1", "Juan Carlos", "Soto")],
        );
        assert_eq!(out[0].teacher_full_name, "Juan Carlos Soto");
        assert_eq!(out[0].teacher_first_names, "Juan");
        assert_eq!(out[0].teacher_last_names, "Carlos Soto");
    }

    #[test]
    fn empty_records_give_empty_view() {
        assert!(resolve(&[], &[student("s1", "Ana")], &[], &[]).is_empty());
    }
}
