//! Filesystem-backed record store.
//!
//! The scraper writes a JSON tree (`courses/*.json`, `schools/*.json`,
//! `all_colleges.json`, `all_schools.json`); this module reads it fresh on
//! each call. A partial data problem never fails the whole load: malformed
//! files are skipped, counted, and reported as diagnostics alongside the
//! result, and a missing tree yields an empty outcome rather than an error.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{College, Course, RawCourse, School, SchoolFile, Subject};

/// Result of a course-tree load, diagnostics included. `files_skipped`
/// counts files that existed but could not be read or parsed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadOutcome {
    pub courses: Vec<Course>,
    pub files_read: usize,
    pub files_skipped: usize,
}

/// A course file is usually an array of records, occasionally one object.
#[derive(Deserialize)]
#[serde(untagged)]
enum CourseFile {
    Many(Vec<RawCourse>),
    One(Box<RawCourse>),
}

/// Read every `*.json` under `<data_dir>/courses` and normalise the records.
/// Directory order is not stable across platforms, so files are visited in
/// name order to keep dedup resolution deterministic.
pub fn load_courses(data_dir: &Path) -> LoadOutcome {
    let dir = data_dir.join("courses");
    let mut outcome = LoadOutcome::default();

    let mut paths = match list_json_files(&dir) {
        Some(paths) => paths,
        None => {
            warn!(dir = %dir.display(), "courses directory missing or unreadable");
            return outcome;
        }
    };
    paths.sort();

    for path in paths {
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable course file");
                outcome.files_skipped += 1;
                continue;
            }
        };
        let raw_courses = match serde_json::from_str::<CourseFile>(&content) {
            Ok(CourseFile::Many(list)) => list,
            Ok(CourseFile::One(one)) => vec![*one],
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping malformed course file");
                outcome.files_skipped += 1;
                continue;
            }
        };
        outcome.files_read += 1;
        outcome.courses.extend(raw_courses.into_iter().map(Course::from_raw));
    }

    outcome
}

/// Collapse duplicate records onto one canonical course per key.
///
/// Resolution order: real data beats sample data, then a record with a
/// non-empty description beats one without, then first-seen wins. Survivors
/// keep their first-seen position, which makes the operation idempotent.
pub fn dedup_courses(courses: Vec<Course>) -> Vec<Course> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Course> = Vec::with_capacity(courses.len());

    for course in courses {
        let key = course.dedup_key();
        match index.get(&key) {
            None => {
                index.insert(key, out.len());
                out.push(course);
            }
            Some(&i) => {
                if supersedes(&course, &out[i]) {
                    out[i] = course;
                }
            }
        }
    }

    out
}

fn supersedes(candidate: &Course, current: &Course) -> bool {
    if candidate.sample != current.sample {
        return current.sample;
    }
    current.course_description.trim().is_empty() && !candidate.course_description.trim().is_empty()
}

// --- Reference data ---

#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub colleges: Vec<College>,
    pub schools: Vec<School>,
    pub subjects: Vec<Subject>,
}

/// Load the college/school/subject lookups used by the selection UI.
/// Missing or malformed files degrade to empty lists with a warning.
pub fn load_reference(data_dir: &Path) -> ReferenceData {
    let colleges: Vec<College> =
        read_json(&data_dir.join("all_colleges.json")).unwrap_or_default();
    let schools: Vec<School> = read_json(&data_dir.join("all_schools.json")).unwrap_or_default();

    let mut subjects: Vec<Subject> = Vec::new();
    let mut seen: HashMap<(String, String), ()> = HashMap::new();
    if let Some(mut paths) = list_json_files(&data_dir.join("schools")) {
        paths.sort();
        for path in paths {
            let Some(file) = read_json::<SchoolFile>(&path) else {
                continue;
            };
            for subject in file.subjects {
                let key = (subject.school_name.clone(), subject.name.to_lowercase());
                if seen.insert(key, ()).is_none() {
                    subjects.push(subject);
                }
            }
        }
    }
    subjects.sort_by(|a, b| a.name.cmp(&b.name));

    ReferenceData { colleges, schools, subjects }
}

fn list_json_files(dir: &Path) -> Option<Vec<std::path::PathBuf>> {
    let entries = std::fs::read_dir(dir).ok()?;
    Some(
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect(),
    )
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    let content = std::fs::read_to_string(path)
        .inspect_err(|e| warn!(file = %path.display(), error = %e, "reference file unreadable"))
        .ok()?;
    serde_json::from_str(&content)
        .inspect_err(|e| warn!(file = %path.display(), error = %e, "reference file malformed"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn data_dir_with_courses(files: &[(&str, &str)]) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let courses = tmp.path().join("courses");
        fs::create_dir(&courses).unwrap();
        for (name, content) in files {
            write(&courses, name, content);
        }
        tmp
    }

    #[test]
    fn loads_arrays_and_skips_malformed_files() {
        let tmp = data_dir_with_courses(&[
            (
                "informatics.json",
                r#"[{"code": "INFR08025", "name": "Informatics 1"},
                    {"code": "INFR08026", "name": "Informatics 2"}]"#,
            ),
            ("broken.json", "{not json"),
            ("single.json", r#"{"code": "MATH08057", "name": "Linear Algebra"}"#),
        ]);

        let outcome = load_courses(tmp.path());
        assert_eq!(outcome.files_read, 2);
        assert_eq!(outcome.files_skipped, 1);
        assert_eq!(outcome.courses.len(), 3);
    }

    #[test]
    fn missing_directory_yields_empty_outcome() {
        let tmp = tempfile::tempdir().unwrap();
        let outcome = load_courses(tmp.path());
        assert!(outcome.courses.is_empty());
        assert_eq!(outcome.files_read, 0);
        assert_eq!(outcome.files_skipped, 0);
    }

    #[test]
    fn bullet_points_round_trip_through_disk() {
        let bullets = ["• Learn Rust", "• Build systems", "• Ship software"];
        let tmp = data_dir_with_courses(&[(
            "enriched.json",
            &format!(
                r#"[{{"code": "INFR08025", "name": "Informatics 1", "bullet_points": {}}}]"#,
                serde_json::to_string(&bullets).unwrap()
            ),
        )]);

        let outcome = load_courses(tmp.path());
        assert_eq!(outcome.courses[0].bullet_points, bullets);
    }

    #[test]
    fn dedup_prefers_described_record() {
        let bare = Course::from_raw(RawCourse {
            code: "INFR08025".to_string(),
            name: "Informatics 1".to_string(),
            ..Default::default()
        });
        let described = Course::from_raw(RawCourse {
            code: "INFR08025".to_string(),
            name: "Informatics 1".to_string(),
            course_description: "Functional programming.".to_string(),
            ..Default::default()
        });

        let deduped = dedup_courses(vec![bare, described]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].course_description, "Functional programming.");
    }

    #[test]
    fn dedup_real_data_supersedes_sample() {
        let sample = Course::from_raw(RawCourse {
            code: "INFR08025".to_string(),
            course_description: "Seeded placeholder.".to_string(),
            sample: true,
            ..Default::default()
        });
        let real = Course::from_raw(RawCourse {
            code: "INFR08025".to_string(),
            ..Default::default()
        });

        let deduped = dedup_courses(vec![sample, real]);
        assert_eq!(deduped.len(), 1);
        assert!(!deduped[0].sample);

        // And a sample never displaces real data, regardless of order.
        let real = Course::from_raw(RawCourse {
            code: "INFR08026".to_string(),
            ..Default::default()
        });
        let sample = Course::from_raw(RawCourse {
            code: "INFR08026".to_string(),
            course_description: "Seeded placeholder.".to_string(),
            sample: true,
            ..Default::default()
        });
        let deduped = dedup_courses(vec![real, sample]);
        assert!(!deduped[0].sample);
    }

    #[test]
    fn dedup_falls_back_to_name_and_is_idempotent() {
        let courses: Vec<Course> = [
            ("", "Shared Name", ""),
            ("", "Shared Name", "described"),
            ("ABCD10001", "Other", ""),
        ]
        .iter()
        .map(|(code, name, description)| {
            Course::from_raw(RawCourse {
                code: code.to_string(),
                name: name.to_string(),
                course_description: description.to_string(),
                ..Default::default()
            })
        })
        .collect();

        let once = dedup_courses(courses);
        assert_eq!(once.len(), 2);
        assert_eq!(once[0].course_description, "described");

        let twice = dedup_courses(once.clone());
        assert_eq!(
            twice.iter().map(|c| c.dedup_key()).collect::<Vec<_>>(),
            once.iter().map(|c| c.dedup_key()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn reference_data_collects_subjects_across_schools() {
        let tmp = tempfile::tempdir().unwrap();
        let schools = tmp.path().join("schools");
        fs::create_dir(&schools).unwrap();
        write(
            tmp.path(),
            "all_colleges.json",
            r#"[{"name": "College of Science and Engineering", "schools_count": 2}]"#,
        );
        write(
            tmp.path(),
            "all_schools.json",
            r#"[{"name": "School of Informatics", "college": "College of Science and Engineering"}]"#,
        );
        write(
            &schools,
            "si.json",
            r#"{"name": "School of Informatics", "code": "si",
                "subjects": [{"name": "Informatics", "school_name": "School of Informatics"},
                             {"name": "Informatics", "school_name": "School of Informatics"}]}"#,
        );

        let reference = load_reference(tmp.path());
        assert_eq!(reference.colleges.len(), 1);
        assert_eq!(reference.schools.len(), 1);
        assert_eq!(reference.subjects.len(), 1);
    }
}
