//! Prompt assembly for the chatbot and bullet-point generation, plus the
//! post-processing that keeps model replies inside their contracts.

use crate::rank::RankedCourse;

/// How many ranked courses go into the chatbot context.
pub const MAX_CONTEXT_COURSES: usize = 7;

const MAX_DESCRIPTION_CHARS: usize = 300;

pub const ADVISOR_SYSTEM_PROMPT: &str = "You are a friendly academic advisor for the University \
of Edinburgh course catalogue. Answer the student's question using only the catalogue extract \
provided below. Recommend specific courses by code and name, mention credits and year where \
relevant, and say clearly when the extract contains nothing suitable. Keep replies short.";

pub const BULLET_SYSTEM_PROMPT: &str =
    "You are a helpful academic assistant that creates concise bullet points about university courses.";

/// Shown to the user when the upstream model call fails; the request itself
/// still succeeds.
pub const CHAT_FALLBACK: &str =
    "Sorry, I'm having trouble answering right now. Please try again in a moment.";

const BULLET_PAD: &str = "• Additional information not available";

/// Serialise the top ranked courses into the numbered catalogue extract the
/// advisor prompt refers to.
pub fn format_course_context(ranked: &[RankedCourse]) -> String {
    if ranked.is_empty() {
        return "No matching courses were found in the catalogue.".to_string();
    }

    let mut out = String::from("Catalogue extract (best matches first):\n");
    for (i, entry) in ranked.iter().take(MAX_CONTEXT_COURSES).enumerate() {
        let course = &entry.course;
        let mut line = format!("{}. {} {}", i + 1, course.code, course.name);
        if !course.school.is_empty() {
            line.push_str(&format!(" ({})", course.school));
        }
        if let Some(credits) = course.credit_value {
            line.push_str(&format!(", {credits} credits"));
        }
        if let Some(level) = course.scqf_level {
            line.push_str(&format!(", SCQF level {level}"));
        }
        if let Some(year) = course.year {
            line.push_str(&format!(", Year {year}"));
        }
        if !course.period.is_empty() {
            line.push_str(&format!(", {}", course.period));
        }
        out.push_str(&line);
        out.push('\n');

        let description = truncate_chars(course.description_text(), MAX_DESCRIPTION_CHARS);
        if !description.is_empty() {
            out.push_str("   ");
            out.push_str(&description);
            out.push('\n');
        }
    }
    out
}

/// The bullet-generation user prompt; the reply contract is enforced by
/// `format_bullets`.
pub fn bullet_prompt(text: &str) -> String {
    format!(
        "Generate EXACTLY 3 bullet points that summarize the key aspects of this course. \
Return ONLY the 3 bullet points without any additional text or numbering. Each bullet point \
should be prefixed with '\u{2022} ' and be on a new line.\n\nCourse information: {text}"
    )
}

/// Normalise a model reply into exactly three bullet strings: split on
/// newlines, force the bullet prefix, pad or truncate to three.
pub fn format_bullets(reply: &str) -> Vec<String> {
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

/// Bullets for a course with no usable description or summary; no model call
/// is made for these.
pub fn placeholder_bullets() -> Vec<String> {
    vec![
        "• No course information available".to_string(),
        "• Please check the course catalog for details".to_string(),
        "• Contact the course administrator for more information".to_string(),
    ]
}

/// Bullets relayed when the upstream model call fails.
pub fn error_bullets() -> Vec<String> {
    vec![
        "• Error generating course information".to_string(),
        "• Please try again later".to_string(),
        "• Contact support if the problem persists".to_string(),
    ]
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Course, RawCourse};
    use crate::rank::RankedCourse;

    fn ranked(code: &str, name: &str, score: u32) -> RankedCourse {
        RankedCourse {
            course: Course::from_raw(RawCourse {
                code: code.to_string(),
                name: name.to_string(),
                credits: "20".to_string(),
                credit_level: "SCQF Level 8 (Year 1 Undergraduate)".to_string(),
                period: "Semester 1".to_string(),
                course_description: "Lectures and labs.".to_string(),
                ..Default::default()
            }),
            score,
        }
    }

    #[test]
    fn context_caps_at_seven_courses() {
        let ranked: Vec<RankedCourse> = (0..10)
            .map(|i| ranked(&format!("CODE{i:05}"), &format!("Course {i}"), 10 - i))
            .collect();
        let context = format_course_context(&ranked);
        assert!(context.contains("CODE00006"));
        assert!(!context.contains("CODE00007"));
        assert!(context.contains("SCQF level 8"));
    }

    #[test]
    fn empty_ranking_yields_explicit_no_match_context() {
        assert!(format_course_context(&[]).contains("No matching courses"));
    }

    #[test]
    fn format_bullets_prefixes_pads_and_truncates() {
        let bullets = format_bullets("First point\n• Second point");
        assert_eq!(bullets.len(), 3);
        assert_eq!(bullets[0], "• First point");
        assert_eq!(bullets[1], "• Second point");
        assert_eq!(bullets[2], "• Additional information not available");

        let bullets = format_bullets("• a\n• b\n• c\n• d\n• e");
        assert_eq!(bullets.len(), 3);
        assert_eq!(bullets[2], "• c");
    }
}
