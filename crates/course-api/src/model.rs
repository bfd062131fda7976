use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// A course record as the scraper wrote it to disk.
///
/// Field names drifted across scraper versions (`school` vs `school_name`,
/// `level` vs `credit_level`, `bulletpoints` vs `bullet_points`, `title` vs
/// `name`), so the aliases absorb every observed variant here, at the
/// deserialization boundary. Nothing downstream sees the drift.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCourse {
    #[serde(default)]
    pub code: String,
    #[serde(default, alias = "title")]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub availability: String,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub credits: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default, alias = "school")]
    pub school_name: String,
    #[serde(default, alias = "college_detail")]
    pub college: String,
    #[serde(default, alias = "level")]
    pub credit_level: String,
    #[serde(default, alias = "description")]
    pub course_description: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub delivery: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, alias = "bulletpoints", deserialize_with = "bullets_or_text")]
    pub bullet_points: Vec<String>,
    #[serde(default, alias = "is_sample", alias = "debug")]
    pub sample: bool,
}

/// Older files store bullet points as one newline-joined string, newer files
/// as a JSON array. Accept both.
fn bullets_or_text<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Bullets {
        List(Vec<String>),
        Text(String),
    }

    Ok(match Bullets::deserialize(deserializer)? {
        Bullets::List(list) => list,
        Bullets::Text(text) => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect(),
    })
}

/// The canonical in-memory course record, with the fields every filter and
/// scoring rule needs derived once at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub code: String,
    pub name: String,
    pub url: String,
    pub availability: String,
    pub period: String,
    pub credits: String,
    pub subject: String,
    pub school: String,
    pub college: String,
    pub credit_level: String,
    pub course_description: String,
    pub summary: String,
    pub delivery: String,
    pub keywords: Vec<String>,
    pub bullet_points: Vec<String>,
    /// SCQF level parsed out of `credit_level`, when present (7–12).
    pub scqf_level: Option<u8>,
    /// Undergraduate year: an explicit "Year N" tag wins, otherwise mapped
    /// from the SCQF level. `None` for postgraduate and unclassified courses.
    pub year: Option<u8>,
    /// Numeric credit value parsed from the free-text `credits` field.
    pub credit_value: Option<u32>,
    pub postgraduate: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sample: bool,
}

impl Course {
    pub fn from_raw(raw: RawCourse) -> Self {
        let scqf_level = parse_scqf_level(&raw.credit_level);
        let year = parse_year(&raw.credit_level, scqf_level);
        let credit_value = raw.credits.trim().parse::<u32>().ok();
        let postgraduate = raw.credit_level.to_lowercase().contains("postgraduate")
            || scqf_level.is_some_and(|l| l >= 11);

        Self {
            code: raw.code.trim().to_string(),
            name: raw.name.trim().to_string(),
            url: raw.url,
            availability: raw.availability,
            period: raw.period,
            credits: raw.credits,
            subject: raw.subject,
            school: raw.school_name,
            college: raw.college,
            credit_level: raw.credit_level,
            course_description: raw.course_description,
            summary: raw.summary,
            delivery: raw.delivery,
            keywords: raw.keywords,
            bullet_points: raw.bullet_points,
            scqf_level,
            year,
            credit_value,
            postgraduate,
            sample: raw.sample,
        }
    }

    /// Deduplication key: course code, or the lowercased name for records the
    /// scraper left without one.
    pub fn dedup_key(&self) -> String {
        if self.code.is_empty() {
            self.name.to_lowercase()
        } else {
            self.code.clone()
        }
    }

    pub fn is_available(&self) -> bool {
        !self.period.trim().eq_ignore_ascii_case("Not delivered this year")
    }

    /// Canonical online-delivery rule: the delivery field or the course text
    /// mentions online/distance learning. See DESIGN.md for the choice.
    pub fn is_online(&self) -> bool {
        let delivery = self.delivery.to_lowercase();
        if delivery.contains("online") || delivery.contains("distance") {
            return true;
        }
        let text = format!("{} {}", self.name, self.course_description).to_lowercase();
        text.contains("online") || text.contains("distance learning")
    }

    pub fn open_to_visiting(&self) -> bool {
        !self
            .availability
            .to_lowercase()
            .contains("not available to visiting")
    }

    /// Description when the scraper captured one, otherwise the summary.
    pub fn description_text(&self) -> &str {
        let description = self.course_description.trim();
        if description.is_empty() || description.eq_ignore_ascii_case("Not entered") {
            self.summary.trim()
        } else {
            description
        }
    }
}

fn scqf_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)scqf\s*level\s*(\d{1,2})").expect("valid regex"))
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)year\s*(\d)").expect("valid regex"))
}

pub fn parse_scqf_level(credit_level: &str) -> Option<u8> {
    scqf_re()
        .captures(credit_level)
        .and_then(|caps| caps[1].parse::<u8>().ok())
}

/// Map a credit-level string to an undergraduate year. An explicit "Year N"
/// tag is authoritative; otherwise SCQF 7–8 → 1, 9 → 2, 10 → 3, and 11+ is
/// postgraduate (no year).
pub fn parse_year(credit_level: &str, scqf_level: Option<u8>) -> Option<u8> {
    if let Some(caps) = year_re().captures(credit_level) {
        if let Ok(year) = caps[1].parse::<u8>() {
            if (1..=5).contains(&year) {
                return Some(year);
            }
        }
    }
    match scqf_level? {
        7 | 8 => Some(1),
        9 => Some(2),
        10 => Some(3),
        _ => None,
    }
}

// --- Reference data ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct College {
    pub name: String,
    #[serde(default)]
    pub schools_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub college: String,
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub school_name: String,
    #[serde(default)]
    pub school_code: String,
    #[serde(default)]
    pub college: String,
}

/// Shape of a `schools/<code>.json` file: the school plus its subject list.
#[derive(Debug, Clone, Deserialize)]
pub struct SchoolFile {
    #[serde(flatten)]
    pub school: School,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_absorb_scraper_drift() {
        let old_style = r#"{
            "code": "INFR08025",
            "title": "Informatics 1",
            "school": "School of Informatics",
            "level": "SCQF Level 8 (Year 1 Undergraduate)",
            "description": "Functional programming and computation.",
            "bulletpoints": "• one\n• two\n• three"
        }"#;
        let raw: RawCourse = serde_json::from_str(old_style).unwrap();
        assert_eq!(raw.name, "Informatics 1");
        assert_eq!(raw.school_name, "School of Informatics");
        assert_eq!(raw.credit_level, "SCQF Level 8 (Year 1 Undergraduate)");
        assert_eq!(raw.course_description, "Functional programming and computation.");
        assert_eq!(raw.bullet_points, vec!["• one", "• two", "• three"]);
    }

    #[test]
    fn bullet_points_accept_array_form() {
        let new_style = r#"{
            "code": "CHEM10001",
            "name": "Organic Chemistry",
            "bullet_points": ["• a", "• b", "• c"]
        }"#;
        let raw: RawCourse = serde_json::from_str(new_style).unwrap();
        assert_eq!(raw.bullet_points.len(), 3);
    }

    #[test]
    fn derives_scqf_year_and_credits() {
        let course = Course::from_raw(RawCourse {
            code: "MATH08057".to_string(),
            name: "Introduction to Linear Algebra".to_string(),
            credits: "20".to_string(),
            credit_level: "SCQF Level 8 (Year 1 Undergraduate)".to_string(),
            ..Default::default()
        });
        assert_eq!(course.scqf_level, Some(8));
        assert_eq!(course.year, Some(1));
        assert_eq!(course.credit_value, Some(20));
        assert!(!course.postgraduate);
    }

    #[test]
    fn explicit_year_tag_beats_scqf_mapping() {
        // SCQF 8 alone maps to year 1; an explicit tag wins.
        assert_eq!(parse_year("SCQF Level 8", Some(8)), Some(1));
        assert_eq!(parse_year("SCQF Level 8 (Year 2 Undergraduate)", Some(8)), Some(2));
    }

    #[test]
    fn postgraduate_detection() {
        let course = Course::from_raw(RawCourse {
            code: "INFR11132".to_string(),
            credit_level: "SCQF Level 11 (Postgraduate)".to_string(),
            ..Default::default()
        });
        assert!(course.postgraduate);
        assert_eq!(course.year, None);
    }

    #[test]
    fn non_numeric_credits_parse_to_none() {
        let course = Course::from_raw(RawCourse {
            code: "X".to_string(),
            credits: "Not available".to_string(),
            ..Default::default()
        });
        assert_eq!(course.credit_value, None);
    }

    #[test]
    fn dedup_key_falls_back_to_name() {
        let course = Course::from_raw(RawCourse {
            name: "Untracked Course".to_string(),
            ..Default::default()
        });
        assert_eq!(course.dedup_key(), "untracked course");
    }

    #[test]
    fn online_rule_checks_delivery_then_text() {
        let by_field = Course::from_raw(RawCourse {
            code: "A".to_string(),
            delivery: "Online".to_string(),
            ..Default::default()
        });
        assert!(by_field.is_online());

        let by_text = Course::from_raw(RawCourse {
            code: "B".to_string(),
            course_description: "Taught by distance learning over two semesters.".to_string(),
            ..Default::default()
        });
        assert!(by_text.is_online());

        let on_campus = Course::from_raw(RawCourse {
            code: "C".to_string(),
            course_description: "Lectures and labs on the central campus.".to_string(),
            ..Default::default()
        });
        assert!(!on_campus.is_online());
    }
}
