//! The one canonical course predicate.
//!
//! Every call site (the courses endpoint, the chatbot's pre-ranking pass,
//! tests) filters through `matches`, so a criterion has exactly one rule.
//! Criteria AND together; values within one multi-valued criterion OR.

use crate::model::Course;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseLevel {
    Undergraduate,
    Postgraduate,
}

impl CourseLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "undergraduate" | "ug" => Some(Self::Undergraduate),
            "postgraduate" | "pg" => Some(Self::Postgraduate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMethod {
    Online,
    InPerson,
}

impl DeliveryMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "online" | "distance" => Some(Self::Online),
            "in-person" | "in_person" | "on-campus" | "on_campus" | "campus" => {
                Some(Self::InPerson)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub schools: Vec<String>,
    pub search: Option<String>,
    pub subjects: Vec<String>,
    pub credit_levels: Vec<u8>,
    pub min_credits: Option<u32>,
    pub max_credits: Option<u32>,
    pub years: Vec<u8>,
    pub course_level: Option<CourseLevel>,
    pub visiting_students: bool,
    pub delivery: Option<DeliveryMethod>,
    pub show_unavailable: bool,
}

pub fn matches(course: &Course, filter: &CourseFilter) -> bool {
    if !filter.show_unavailable && !course.is_available() {
        return false;
    }

    if !filter.schools.is_empty()
        && !filter.schools.iter().any(|school| contains_ci(&course.school, school))
    {
        return false;
    }

    if let Some(query) = filter.search.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let hit = contains_ci(&course.name, query)
            || contains_ci(&course.code, query)
            || contains_ci(&course.course_description, query)
            || contains_ci(&course.summary, query);
        if !hit {
            return false;
        }
    }

    if !filter.subjects.is_empty() {
        let hit = filter.subjects.iter().any(|subject| {
            contains_ci(&course.subject, subject)
                || contains_ci(&course.name, subject)
                || contains_ci(&course.course_description, subject)
        });
        if !hit {
            return false;
        }
    }

    if !filter.credit_levels.is_empty()
        && !course.scqf_level.is_some_and(|level| filter.credit_levels.contains(&level))
    {
        return false;
    }

    // Inclusive range; a course whose credits don't parse is excluded
    // whenever either bound is supplied.
    if filter.min_credits.is_some() || filter.max_credits.is_some() {
        let Some(value) = course.credit_value else {
            return false;
        };
        if filter.min_credits.is_some_and(|min| value < min) {
            return false;
        }
        if filter.max_credits.is_some_and(|max| value > max) {
            return false;
        }
    }

    if !filter.years.is_empty() && !course.year.is_some_and(|year| filter.years.contains(&year)) {
        return false;
    }

    if let Some(level) = filter.course_level {
        let course_level = if course.postgraduate {
            CourseLevel::Postgraduate
        } else {
            CourseLevel::Undergraduate
        };
        if course_level != level {
            return false;
        }
    }

    if filter.visiting_students && !course.open_to_visiting() {
        return false;
    }

    if let Some(delivery) = filter.delivery {
        let course_delivery = if course.is_online() {
            DeliveryMethod::Online
        } else {
            DeliveryMethod::InPerson
        };
        if course_delivery != delivery {
            return false;
        }
    }

    true
}

pub fn apply(courses: &[Course], filter: &CourseFilter) -> Vec<Course> {
    courses
        .iter()
        .filter(|course| matches(course, filter))
        .cloned()
        .collect()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
