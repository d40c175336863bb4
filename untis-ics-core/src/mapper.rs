//! Lesson to calendar event mapping.
//!
//! [`map_lesson`] is pure and total: every lesson yields exactly one event,
//! and malformed date or time numbers produce malformed fields instead of
//! errors. Validation happens in the encoder.

use crate::{CalendarEvent, EventDateTime, NamedElement, REGULAR_CODE, RawLesson};

/// Title used when a lesson names no subject, teacher or room
pub const GENERIC_TITLE: &str = "Lesson";
/// Location used when a lesson names no room
pub const NO_ROOM_LOCATION: &str = "No room specified";
/// Suffix of every generated UID
pub const UID_NAMESPACE: &str = "untis-ics";

const UID_NO_SUBJECT: &str = "lesson";
const UID_NO_ROOM: &str = "no-room";
const UID_NO_TEACHER: &str = "no-teacher";

/// Convert one lesson into one calendar event
pub fn map_lesson(lesson: &RawLesson) -> CalendarEvent {
    let subjects = join_names(&lesson.subjects, NamedElement::long_name, ", ");
    let rooms = join_names(&lesson.rooms, NamedElement::short_name, ", ");
    let teachers = join_names(&lesson.teachers, NamedElement::long_name, ", ");
    let classes = join_names(&lesson.classes, NamedElement::long_name, ", ");

    let title = build_title(subjects.as_deref(), teachers.as_deref(), rooms.as_deref());
    let description = build_description(lesson, teachers.as_deref(), classes.as_deref());

    CalendarEvent {
        start: EventDateTime::from_parts(lesson.date, lesson.start_time),
        end: EventDateTime::from_parts(lesson.date, lesson.end_time),
        title,
        location: rooms.unwrap_or_else(|| NO_ROOM_LOCATION.to_string()),
        description,
        uid: build_uid(lesson),
        sequence: 1,
    }
}

/// Map every lesson, keeping their order
pub fn map_lessons(lessons: &[RawLesson]) -> Vec<CalendarEvent> {
    lessons.iter().map(map_lesson).collect()
}

/// `None` for an empty list, so callers can fall back to something else
fn join_names(
    elements: &[NamedElement],
    name: fn(&NamedElement) -> &str,
    separator: &str,
) -> Option<String> {
    let names: Vec<&str> = elements
        .iter()
        .map(name)
        .filter(|n| !n.is_empty())
        .collect();

    if names.is_empty() {
        None
    } else {
        Some(names.join(separator))
    }
}

fn build_title(subjects: Option<&str>, teachers: Option<&str>, rooms: Option<&str>) -> String {
    match (subjects, teachers, rooms) {
        (Some(subjects), _, _) => subjects.to_string(),
        (None, Some(teachers), _) => format!("{GENERIC_TITLE} ({teachers})"),
        (None, None, Some(rooms)) => format!("{GENERIC_TITLE} ({rooms})"),
        (None, None, None) => GENERIC_TITLE.to_string(),
    }
}

fn build_description(lesson: &RawLesson, teachers: Option<&str>, classes: Option<&str>) -> String {
    let status = lesson
        .code
        .as_deref()
        .filter(|code| !code.is_empty() && *code != REGULAR_CODE);

    let lines = [
        ("Teacher", teachers),
        ("Class", classes),
        ("Status", status),
        ("Substitution", present(lesson.substitution_text.as_deref())),
        ("Info", present(lesson.info.as_deref())),
        ("Type", present(lesson.activity_type.as_deref())),
    ];

    lines
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| format!("{label}: {v}")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Same lesson, same UID, across every regeneration
fn build_uid(lesson: &RawLesson) -> String {
    let subjects = join_names(&lesson.subjects, NamedElement::long_name, "-")
        .unwrap_or_else(|| UID_NO_SUBJECT.to_string());
    let rooms = join_names(&lesson.rooms, NamedElement::short_name, "-")
        .unwrap_or_else(|| UID_NO_ROOM.to_string());
    let teachers = join_names(&lesson.teachers, NamedElement::long_name, "-")
        .unwrap_or_else(|| UID_NO_TEACHER.to_string());

    format!(
        "{}-{}-{}-{}-{}@{}",
        lesson.date, lesson.start_time, subjects, rooms, teachers, UID_NAMESPACE
    )
}
