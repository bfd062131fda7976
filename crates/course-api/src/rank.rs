//! Heuristic relevance ranking for free-text interests.
//!
//! This is a hand-tuned scorer over weighted field matches, kept exactly
//! that: no TF-IDF, no learned weights. The weight table is named and fixed
//! so individual terms of the heuristic stay independently testable.

use serde::{Deserialize, Serialize};

use crate::model::Course;

#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub name: u32,
    pub keywords: u32,
    pub description: u32,
    pub bullet_points: u32,
    pub code: u32,
    pub school: u32,
    /// Per original (non-expanded) term found verbatim in the course name.
    pub exact_bonus: u32,
    /// When the requested year equals the course's derived year.
    pub year_bonus: u32,
}

pub const DEFAULT_WEIGHTS: ScoreWeights = ScoreWeights {
    name: 4,
    keywords: 3,
    description: 2,
    bullet_points: 2,
    code: 1,
    school: 1,
    exact_bonus: 5,
    year_bonus: 3,
};

/// Words too generic to score on their own. They still participate in
/// bigrams/trigrams ("introduction to data" matches as a phrase).
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "the", "in", "of", "to", "for", "on", "with", "about", "into", "am", "i",
    "im", "my", "me", "we", "want", "like", "interested", "learn", "learning", "study",
    "studying", "course", "courses", "class", "classes",
];

/// Fixed domain synonym clusters. Expansion is one-way: a matched key adds
/// its cluster terms to the search set.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("data", &["statistics", "analytics", "databases", "data science"]),
    ("ai", &["artificial intelligence", "machine learning", "neural networks"]),
    ("artificial intelligence", &["machine learning", "ai"]),
    ("machine learning", &["artificial intelligence", "statistics"]),
    ("programming", &["software", "computer science", "informatics"]),
    ("computing", &["computer science", "informatics", "software"]),
    ("math", &["mathematics"]),
    ("maths", &["mathematics", "statistics", "algebra", "calculus"]),
    ("business", &["management", "economics", "finance", "marketing"]),
    ("medicine", &["medical", "clinical", "health"]),
    ("law", &["legal", "jurisprudence"]),
    ("environment", &["sustainability", "ecology", "climate"]),
    ("psychology", &["cognition", "behaviour", "mental health"]),
    ("language", &["linguistics", "literature"]),
    ("history", &["historical", "heritage"]),
    ("art", &["design", "visual culture"]),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCourse {
    #[serde(flatten)]
    pub course: Course,
    pub score: u32,
}

/// Lowercase unigrams (stopwords dropped) plus adjacent bigrams and trigrams
/// over the raw word sequence.
pub fn tokenize(interests: &str) -> Vec<String> {
    let words: Vec<String> = interests
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect();

    let mut terms: Vec<String> = Vec::new();
    for word in &words {
        if word.len() >= 2 && !STOPWORDS.contains(&word.as_str()) {
            push_unique(&mut terms, word.clone());
        }
    }
    for pair in words.windows(2) {
        push_unique(&mut terms, pair.join(" "));
    }
    for triple in words.windows(3) {
        push_unique(&mut terms, triple.join(" "));
    }
    terms
}

/// Expand a term set with singular/plural variants and the synonym table.
pub fn expand_terms(terms: &[String]) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::new();
    for term in terms {
        push_unique(&mut expanded, term.clone());
        for variant in plural_variants(term) {
            push_unique(&mut expanded, variant);
        }
        for (key, cluster) in SYNONYMS {
            if term == key {
                for synonym in *cluster {
                    push_unique(&mut expanded, synonym.to_string());
                }
            }
        }
    }
    expanded
}

fn plural_variants(term: &str) -> Vec<String> {
    let mut variants = Vec::new();
    if let Some(stem) = term.strip_suffix("ies") {
        variants.push(format!("{stem}y"));
    } else if let Some(stem) = term.strip_suffix('s') {
        if stem.len() >= 2 {
            variants.push(stem.to_string());
        }
    } else if let Some(stem) = term.strip_suffix('y') {
        variants.push(format!("{stem}ies"));
        variants.push(format!("{term}s"));
    } else {
        variants.push(format!("{term}s"));
    }
    variants
}

fn push_unique(terms: &mut Vec<String>, term: String) {
    if !terms.contains(&term) {
        terms.push(term);
    }
}

/// Score every course against the interests and return the matches sorted by
/// descending score. Zero-score courses are dropped; ties keep input order.
pub fn rank_courses(
    courses: &[Course],
    interests: &str,
    year: Option<u8>,
    weights: &ScoreWeights,
) -> Vec<RankedCourse> {
    let original = tokenize(interests);
    let expanded = expand_terms(&original);
    if expanded.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<RankedCourse> = courses
        .iter()
        .filter_map(|course| {
            let score = score_course(course, &original, &expanded, year, weights);
            (score > 0).then(|| RankedCourse { course: course.clone(), score })
        })
        .collect();

    // Vec::sort_by is stable, so equal scores preserve input order.
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

fn score_course(
    course: &Course,
    original: &[String],
    expanded: &[String],
    year: Option<u8>,
    weights: &ScoreWeights,
) -> u32 {
    let name = course.name.to_lowercase();
    let keywords = course.keywords.join(" ").to_lowercase();
    let description = format!("{} {}", course.course_description, course.summary).to_lowercase();
    let bullets = course.bullet_points.join(" ").to_lowercase();
    let code = course.code.to_lowercase();
    let school = course.school.to_lowercase();

    let mut score = 0u32;
    for term in expanded {
        if name.contains(term) {
            score += weights.name;
        }
        if keywords.contains(term) {
            score += weights.keywords;
        }
        if description.contains(term) {
            score += weights.description;
        }
        if bullets.contains(term) {
            score += weights.bullet_points;
        }
        if code.contains(term) {
            score += weights.code;
        }
        if school.contains(term) {
            score += weights.school;
        }
    }

    for term in original {
        if name.contains(term) {
            score += weights.exact_bonus;
        }
    }

    // Year alignment boosts relevant courses; it never resurrects a course
    // with no text match at all.
    if score > 0 {
        if let (Some(wanted), Some(actual)) = (year, course.year) {
            if wanted == actual {
                score += weights.year_bonus;
            }
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawCourse;

    fn named_course(code: &str, name: &str, credit_level: &str) -> Course {
        Course::from_raw(RawCourse {
            code: code.to_string(),
            name: name.to_string(),
            credit_level: credit_level.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn tokenize_builds_ngrams_and_drops_stopword_unigrams() {
        let terms = tokenize("introduction to data science");
        assert!(terms.contains(&"data".to_string()));
        assert!(terms.contains(&"science".to_string()));
        assert!(terms.contains(&"data science".to_string()));
        assert!(terms.contains(&"introduction to data".to_string()));
        assert!(!terms.contains(&"to".to_string()));
    }

    #[test]
    fn expansion_adds_plurals_and_synonyms() {
        let expanded = expand_terms(&["data".to_string(), "economy".to_string()]);
        assert!(expanded.contains(&"statistics".to_string()));
        assert!(expanded.contains(&"datas".to_string()) || expanded.contains(&"data".to_string()));
        assert!(expanded.contains(&"economies".to_string()));
    }

    #[test]
    fn scores_are_non_increasing() {
        let courses = vec![
            named_course("STAT08001", "Statistics for Everyone", "SCQF Level 8"),
            named_course("INFR08030", "Data Science Fundamentals", "SCQF Level 8"),
            named_course("HIST10002", "Medieval Scotland", "SCQF Level 10"),
            named_course("MATH08058", "Statistical Methods", "SCQF Level 8"),
        ];
        let ranked = rank_courses(&courses, "data science", None, &DEFAULT_WEIGHTS);
        assert!(!ranked.is_empty());
        assert!(ranked.windows(2).all(|pair| pair[0].score >= pair[1].score));
        // No text match at all drops out entirely.
        assert!(ranked.iter().all(|r| r.course.code != "HIST10002"));
    }

    #[test]
    fn year_alignment_outranks_scqf_mapped_mismatch() {
        // SCQF 8 maps to year 1; an otherwise-similar course tagged Year 2
        // must win for a year-2 student.
        let year_one = named_course(
            "INFR08030",
            "Introduction to Data Science",
            "SCQF Level 8",
        );
        let year_two = named_course(
            "INFR09031",
            "Introduction to Data Science",
            "SCQF Level 9 (Year 2 Undergraduate)",
        );
        let ranked = rank_courses(
            &[year_one, year_two],
            "data science",
            Some(2),
            &DEFAULT_WEIGHTS,
        );
        assert_eq!(ranked[0].course.code, "INFR09031");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn exact_terms_outscore_synonym_matches() {
        let exact = named_course("A", "Data Platforms", "SCQF Level 8");
        let synonym_only = named_course("B", "Statistics Platforms", "SCQF Level 8");
        let ranked = rank_courses(&[synonym_only, exact], "data", None, &DEFAULT_WEIGHTS);
        assert_eq!(ranked[0].course.code, "A");
    }

    #[test]
    fn ties_keep_input_order() {
        let first = named_course("A", "Quantum Physics", "SCQF Level 10");
        let second = named_course("B", "Quantum Physics", "SCQF Level 10");
        let ranked = rank_courses(&[first, second], "quantum", None, &DEFAULT_WEIGHTS);
        assert_eq!(ranked[0].course.code, "A");
        assert_eq!(ranked[1].course.code, "B");
    }

    #[test]
    fn empty_interests_rank_nothing() {
        let courses = vec![named_course("A", "Anything", "SCQF Level 8")];
        assert!(rank_courses(&courses, "", None, &DEFAULT_WEIGHTS).is_empty());
    }
}
