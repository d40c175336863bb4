use super::*;
use crate::{CalendarMethod, EventDateTime};
use chrono::TimeZone;
use ical::parser::ical::{IcalParser, component::IcalCalendar};
use std::io::BufReader;

fn generated_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
}

fn math_event() -> CalendarEvent {
    CalendarEvent {
        start: EventDateTime::new(2024, 3, 15, 8, 0),
        end: EventDateTime::new(2024, 3, 15, 9, 30),
        title: "Math".to_string(),
        location: "101".to_string(),
        description: "Teacher: Mrs Smith\nClass: 5a, 5b".to_string(),
        uid: "20240315-800-Math-101-Mrs Smith@untis-ics".to_string(),
        sequence: 1,
    }
}

fn parse(ics: &str) -> IcalCalendar {
    let mut parser = IcalParser::new(BufReader::new(ics.as_bytes()));
    let calendar = parser
        .next()
        .expect("no calendar in output")
        .expect("output is not valid iCalendar");
    assert!(parser.next().is_none());
    calendar
}

fn property<'a>(properties: &'a [ical::property::Property], name: &str) -> Option<&'a str> {
    properties
        .iter()
        .find(|p| p.name == name)
        .and_then(|p| p.value.as_deref())
}

#[test]
fn test_calendar_header() {
    let options = IcsOptions {
        calendar_name: Some("Timetable 5a".to_string()),
        ..Default::default()
    };
    let ics_content = IcsGenerator::new(options)
        .generate(&[], generated_at())
        .expect("failed to generate ICS");

    assert!(ics_content.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
    assert!(ics_content.ends_with("END:VCALENDAR\r\n"));

    let calendar = parse(&ics_content);
    assert_eq!(
        property(&calendar.properties, "PRODID"),
        Some("-//untis-ics//Timetable Calendar//EN")
    );
    assert_eq!(property(&calendar.properties, "METHOD"), Some("PUBLISH"));
    assert_eq!(
        property(&calendar.properties, "X-WR-CALNAME"),
        Some("Timetable 5a")
    );
    assert!(calendar.events.is_empty());
}

#[test]
fn test_method_and_product_id_follow_options() {
    let options = IcsOptions {
        product_id: "-//Example School//Plan//DE".to_string(),
        method: CalendarMethod::Request,
        calendar_name: None,
    };
    let ics_content = IcsGenerator::new(options)
        .generate(&[math_event()], generated_at())
        .unwrap();

    let calendar = parse(&ics_content);
    assert_eq!(
        property(&calendar.properties, "PRODID"),
        Some("-//Example School//Plan//DE")
    );
    assert_eq!(property(&calendar.properties, "METHOD"), Some("REQUEST"));
    assert!(property(&calendar.properties, "X-WR-CALNAME").is_none());
}

#[test]
fn test_event_properties() {
    let ics_content = IcsGenerator::default()
        .generate(&[math_event()], generated_at())
        .unwrap();

    let calendar = parse(&ics_content);
    assert_eq!(calendar.events.len(), 1);

    let props = &calendar.events[0].properties;
    assert_eq!(
        property(props, "UID"),
        Some("20240315-800-Math-101-Mrs Smith@untis-ics")
    );
    assert_eq!(property(props, "SEQUENCE"), Some("1"));
    assert_eq!(property(props, "DTSTAMP"), Some("20240301T123000Z"));
    assert_eq!(property(props, "DTSTART"), Some("20240315T080000"));
    assert_eq!(property(props, "DTEND"), Some("20240315T093000"));
    assert_eq!(property(props, "SUMMARY"), Some("Math"));
    assert_eq!(property(props, "LOCATION"), Some("101"));
    assert_eq!(
        property(props, "DESCRIPTION"),
        Some("Teacher: Mrs Smith\\nClass: 5a\\, 5b")
    );
}

#[test]
fn test_empty_description_is_omitted() {
    let event = CalendarEvent {
        description: String::new(),
        ..math_event()
    };
    let ics_content = IcsGenerator::default()
        .generate(&[event], generated_at())
        .unwrap();

    assert!(!ics_content.contains("DESCRIPTION"));
}

#[test]
fn test_events_keep_input_order() {
    let second = CalendarEvent {
        start: EventDateTime::new(2024, 3, 15, 10, 0),
        end: EventDateTime::new(2024, 3, 15, 10, 45),
        title: "Physics".to_string(),
        uid: "physics@untis-ics".to_string(),
        ..math_event()
    };
    let ics_content = IcsGenerator::default()
        .generate(&[math_event(), second], generated_at())
        .unwrap();

    let calendar = parse(&ics_content);
    let titles: Vec<_> = calendar
        .events
        .iter()
        .filter_map(|e| property(&e.properties, "SUMMARY"))
        .collect();
    assert_eq!(titles, ["Math", "Physics"]);
}

#[test]
fn test_escape_text() {
    assert_eq!(escape_text("a,b;c\\d"), "a\\,b\\;c\\\\d");
    assert_eq!(escape_text("line1\r\nline2\nline3"), "line1\\nline2\\nline3");
}

#[test]
fn test_long_lines_are_folded() {
    let event = CalendarEvent {
        description: "Info: ".to_string() + &"Klassenarbeit-über-Brüche;".repeat(10),
        ..math_event()
    };
    let ics_content = IcsGenerator::default()
        .generate(&[event.clone()], generated_at())
        .unwrap();

    for line in ics_content.split("\r\n") {
        assert!(line.len() <= MAX_LINE_OCTETS, "line too long: {line:?}");
    }

    let calendar = parse(&ics_content);
    assert_eq!(
        property(&calendar.events[0].properties, "DESCRIPTION"),
        Some(escape_text(&event.description).as_str())
    );
}

fn invalid_events() -> [CalendarEvent; 3] {
    let invalid_month = CalendarEvent {
        start: EventDateTime::new(2024, 13, 15, 8, 0),
        end: EventDateTime::new(2024, 13, 15, 8, 45),
        uid: "invalid-month@untis-ics".to_string(),
        ..math_event()
    };
    let invalid_time = CalendarEvent {
        end: EventDateTime::new(2024, 3, 15, 8, 70),
        uid: "invalid-time@untis-ics".to_string(),
        ..math_event()
    };
    let reversed = CalendarEvent {
        start: EventDateTime::new(2024, 3, 15, 10, 0),
        end: EventDateTime::new(2024, 3, 15, 9, 0),
        uid: "reversed@untis-ics".to_string(),
        ..math_event()
    };
    [invalid_month, invalid_time, reversed]
}

#[test]
fn test_invalid_events_are_skipped() {
    let mut events = vec![math_event()];
    events.extend(invalid_events());

    let ics_content = IcsGenerator::default()
        .generate(&events, generated_at())
        .unwrap();

    let calendar = parse(&ics_content);
    assert_eq!(calendar.events.len(), 1);
    assert_eq!(
        property(&calendar.events[0].properties, "UID"),
        Some(math_event().uid.as_str())
    );
}

#[test]
fn test_only_invalid_events_fail_generation() {
    for event in invalid_events() {
        let result = IcsGenerator::default().generate(&[event], generated_at());
        assert!(matches!(result, Err(Error::IcsGeneration(_))));
    }

    let result = IcsGenerator::default().generate(&invalid_events(), generated_at());
    assert!(matches!(result, Err(Error::IcsGeneration(_))));
}
