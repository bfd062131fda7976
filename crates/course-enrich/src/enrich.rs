//! One-shot enrichment pass: generate marketing bullet points for every
//! course that lacks them and write the results back into the JSON files.
//!
//! Files are edited as raw `serde_json::Value` trees so fields this tool
//! doesn't know about survive the rewrite untouched. A course that already
//! carries bullet points is skipped, which makes repeated runs idempotent.

use std::path::Path;

use serde_json::{json, Value};
use tracing::{info, warn};

use catalogue_common::chat::{ChatClient, ChatMessage};

const BULLET_SYSTEM_PROMPT: &str =
    "You are a helpful academic assistant that creates concise bullet points about university courses.";

const BULLET_PAD: &str = "• Additional information not available";

#[derive(Debug, Default)]
pub struct EnrichStats {
    pub files_processed: usize,
    pub files_updated: usize,
    pub courses_seen: usize,
    pub courses_enriched: usize,
    pub errors: usize,
}

/// Walk `<data_dir>/courses/*.json` and enrich each file in place.
pub async fn enrich_directory(data_dir: &Path, chat: &ChatClient) -> EnrichStats {
    let mut stats = EnrichStats::default();
    let dir = data_dir.join("courses");

    let mut paths = match list_json_files(&dir) {
        Some(paths) => paths,
        None => {
            warn!(dir = %dir.display(), "courses directory missing or unreadable");
            return stats;
        }
    };
    paths.sort();

    for path in paths {
        stats.files_processed += 1;
        let courses = match read_course_array(&path) {
            Some(courses) => courses,
            None => {
                stats.errors += 1;
                continue;
            }
        };

        let mut courses = courses;
        let mut changed = false;
        for course in courses.iter_mut() {
            stats.courses_seen += 1;
            if !needs_bullets(course) {
                continue;
            }
            let Some(text) = bullet_source_text(course) else {
                set_bullet_points(course, &placeholder_bullets());
                stats.courses_enriched += 1;
                changed = true;
                continue;
            };
            match generate_bullets(chat, &text).await {
                Ok(bullets) => {
                    set_bullet_points(course, &bullets);
                    stats.courses_enriched += 1;
                    changed = true;
                }
                Err(e) => {
                    let code = course.get("code").and_then(Value::as_str).unwrap_or("unknown");
                    warn!(code, error = %e, "bullet generation failed, leaving course untouched");
                    stats.errors += 1;
                }
            }
        }

        if changed {
            match write_course_array(&path, &courses) {
                Ok(()) => {
                    stats.files_updated += 1;
                    info!(file = %path.display(), "file updated");
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "failed to write updated file");
                    stats.errors += 1;
                }
            }
        }
    }

    stats
}

async fn generate_bullets(
    chat: &ChatClient,
    text: &str,
) -> Result<Vec<String>, catalogue_common::error::ChatError> {
    let prompt = format!(
        "Generate EXACTLY 3 bullet points that summarize the key aspects of this course. \
Return ONLY the 3 bullet points without any additional text or numbering. Each bullet point \
should be prefixed with '\u{2022} ' and be on a new line.\n\nCourse information: {text}"
    );
    let reply = chat
        .complete(
            vec![ChatMessage::system(BULLET_SYSTEM_PROMPT), ChatMessage::user(prompt)],
            0.7,
            300,
        )
        .await?;
    Ok(normalize_bullets(&reply))
}

/// A course needs bullets unless either field variant already holds some.
pub fn needs_bullets(course: &Value) -> bool {
    for field in ["bullet_points", "bulletpoints"] {
        match course.get(field) {
            Some(Value::Array(items)) if !items.is_empty() => return false,
            Some(Value::String(text)) if !text.trim().is_empty() => return false,
            _ => {}
        }
    }
    true
}

/// Description when usable, falling back to summary, then title/name.
pub fn bullet_source_text(course: &Value) -> Option<String> {
    let description = course
        .get("course_description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("Not entered"));
    if let Some(description) = description {
        return Some(description.to_string());
    }

    for field in ["summary", "title", "name"] {
        let value = course.get(field).and_then(Value::as_str).map(str::trim);
        if let Some(text) = value.filter(|t| !t.is_empty()) {
            return Some(text.to_string());
        }
    }
    None
}

/// Write the canonical `bullet_points` array and drop the legacy spelling so
/// each file converges on one field name.
pub fn set_bullet_points(course: &mut Value, bullets: &[String]) {
    if let Some(object) = course.as_object_mut() {
        object.remove("bulletpoints");
        object.insert("bullet_points".to_string(), json!(bullets));
    }
}

pub fn normalize_bullets(reply: &str) -> Vec<String> {
    let mut bullets: Vec<String> = reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if line.starts_with('\u{2022}') {
                line.to_string()
            } else {
                format!("\u{2022} {line}")
            }
        })
        .collect();
    while bullets.len() < 3 {
        bullets.push(BULLET_PAD.to_string());
    }
    bullets.truncate(3);
    bullets
}

fn placeholder_bullets() -> Vec<String> {
    vec![
        "• No course information available".to_string(),
        "• Please check the course catalog for details".to_string(),
        "• Contact the course administrator for more information".to_string(),
    ]
}

fn read_course_array(path: &Path) -> Option<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .inspect_err(|e| warn!(file = %path.display(), error = %e, "skipping unreadable file"))
        .ok()?;
    let parsed: Value = serde_json::from_str(&content)
        .inspect_err(|e| warn!(file = %path.display(), error = %e, "skipping malformed file"))
        .ok()?;
    match parsed {
        Value::Array(courses) => Some(courses),
        _ => {
            warn!(file = %path.display(), "skipping file that is not a course array");
            None
        }
    }
}

fn write_course_array(path: &Path, courses: &[Value]) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(courses)?;
    std::fs::write(path, json)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_bullets_recognises_both_field_spellings() {
        assert!(needs_bullets(&json!({"code": "A"})));
        assert!(!needs_bullets(&json!({"bullet_points": ["• a"]})));
        assert!(!needs_bullets(&json!({"bulletpoints": "• a\n• b"})));
        assert!(needs_bullets(&json!({"bullet_points": []})));
        assert!(needs_bullets(&json!({"bulletpoints": "  "})));
    }

    #[test]
    fn source_text_prefers_real_description() {
        let course = json!({
            "course_description": "Not entered",
            "summary": "A summary",
            "title": "A title"
        });
        assert_eq!(bullet_source_text(&course).as_deref(), Some("A summary"));

        let course = json!({"course_description": "Full description"});
        assert_eq!(bullet_source_text(&course).as_deref(), Some("Full description"));

        assert_eq!(bullet_source_text(&json!({})), None);
    }

    #[test]
    fn set_bullet_points_replaces_legacy_field_and_keeps_others() {
        let mut course = json!({
            "code": "INFR08025",
            "quota": 300,
            "bulletpoints": "• old"
        });
        let bullets = vec!["• a".to_string(), "• b".to_string(), "• c".to_string()];
        set_bullet_points(&mut course, &bullets);

        assert_eq!(course.get("bulletpoints"), None);
        assert_eq!(course["bullet_points"], json!(["• a", "• b", "• c"]));
        // Unknown fields survive the rewrite.
        assert_eq!(course["quota"], json!(300));
    }

    #[test]
    fn normalize_bullets_enforces_exactly_three() {
        assert_eq!(normalize_bullets("one").len(), 3);
        assert_eq!(normalize_bullets("• a\n• b\n• c\n• d").len(), 3);
        assert_eq!(normalize_bullets("plain")[0], "• plain");
    }

    #[test]
    fn rewrite_round_trips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("courses.json");
        let mut courses = vec![json!({"code": "INFR08025", "name": "Informatics 1"})];
        let bullets = vec![
            "• Learn functional programming".to_string(),
            "• Model computation".to_string(),
            "• Write small interpreters".to_string(),
        ];
        set_bullet_points(&mut courses[0], &bullets);
        write_course_array(&path, &courses).unwrap();

        let reloaded = read_course_array(&path).unwrap();
        assert_eq!(reloaded[0]["bullet_points"], json!(bullets));
        assert!(!needs_bullets(&reloaded[0]));
    }
}
