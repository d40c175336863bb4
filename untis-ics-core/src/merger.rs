//! Folding of back-to-back identical events.
//!
//! WebUntis reports a double period as two lessons. [`merge_consecutive`]
//! folds such runs into a single event, in one left-to-right pass.

use crate::CalendarEvent;

/// Whether `next` continues `current` without a gap
pub fn should_merge(current: &CalendarEvent, next: &CalendarEvent) -> bool {
    current.title == next.title
        && current.location == next.location
        && current.description == next.description
        && current.start.same_day(&next.start)
        && current.end.same_time_of_day(&next.start)
}

/// Merge runs of adjacent, identical events while keeping chronological order.
///
/// Every event is compared with the last emitted one, so a run of any length
/// collapses into one event and a second pass changes nothing.
pub fn merge_consecutive(events: Vec<CalendarEvent>) -> Vec<CalendarEvent> {
    let mut merged: Vec<CalendarEvent> = Vec::with_capacity(events.len());

    for event in events {
        match merged.last_mut() {
            Some(last) if should_merge(last, &event) => {
                *last = last.extended_to(&event);
            }
            _ => merged.push(event),
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventDateTime, NamedElement, RawLesson, mapper::map_lessons};

    fn event(day: u32, start: (u32, u32), end: (u32, u32), title: &str) -> CalendarEvent {
        CalendarEvent {
            start: EventDateTime::new(2024, 3, day, start.0, start.1),
            end: EventDateTime::new(2024, 3, day, end.0, end.1),
            title: title.to_string(),
            location: "101".to_string(),
            description: "Teacher: Mrs Smith".to_string(),
            uid: format!("{day}-{}{}-{title}@test", start.0, start.1),
            sequence: 1,
        }
    }

    #[test]
    fn merges_two_adjacent_identical_events() {
        let a = event(15, (8, 0), (8, 45), "Math");
        let b = event(15, (8, 45), (9, 30), "Math");

        let merged = merge_consecutive(vec![a.clone(), b]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start, a.start);
        assert_eq!(merged[0].end, EventDateTime::new(2024, 3, 15, 9, 30));
        assert_eq!(merged[0].uid, a.uid);
    }

    #[test]
    fn differing_fields_block_merging() {
        let a = event(15, (8, 0), (8, 45), "Math");

        let mut other_title = event(15, (8, 45), (9, 30), "Math");
        other_title.title = "Physics".to_string();

        let mut other_location = event(15, (8, 45), (9, 30), "Math");
        other_location.location = "102".to_string();

        let mut other_description = event(15, (8, 45), (9, 30), "Math");
        other_description.description = "Teacher: Mr Jones".to_string();

        for b in [other_title, other_location, other_description] {
            let input = vec![a.clone(), b];
            assert_eq!(merge_consecutive(input.clone()), input);
        }
    }

    #[test]
    fn gaps_overlaps_and_day_changes_block_merging() {
        let a = event(15, (8, 0), (8, 45), "Math");

        let gap = event(15, (8, 46), (9, 30), "Math");
        let overlap = event(15, (8, 30), (9, 30), "Math");
        let next_day = event(16, (8, 45), (9, 30), "Math");

        for b in [gap, overlap, next_day] {
            let input = vec![a.clone(), b];
            assert_eq!(merge_consecutive(input.clone()), input);
        }
    }

    #[test]
    fn chain_of_three_collapses_into_one() {
        let a = event(15, (8, 0), (8, 45), "Math");
        let b = event(15, (8, 45), (9, 30), "Math");
        let c = event(15, (9, 30), (10, 15), "Math");

        let merged = merge_consecutive(vec![a.clone(), b, c.clone()]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start, a.start);
        assert_eq!(merged[0].end, c.end);
    }

    #[test]
    fn runs_are_merged_independently_and_order_is_kept() {
        let events = vec![
            event(15, (8, 0), (8, 45), "Math"),
            event(15, (8, 45), (9, 30), "Math"),
            event(15, (9, 30), (10, 15), "Math"),
            event(15, (10, 15), (11, 0), "Math"),
            event(15, (11, 0), (11, 45), "Art"),
            event(15, (12, 0), (12, 45), "Art"),
            event(15, (12, 45), (13, 30), "Art"),
        ];

        let merged = merge_consecutive(events);

        let spans: Vec<_> = merged
            .iter()
            .map(|e| (e.title.as_str(), e.start.hour, e.start.minute, e.end.hour, e.end.minute))
            .collect();
        assert_eq!(
            spans,
            [
                ("Math", 8, 0, 11, 0),
                ("Art", 11, 0, 11, 45),
                ("Art", 12, 0, 13, 30),
            ]
        );
    }

    #[test]
    fn merging_is_idempotent() {
        let events = vec![
            event(15, (8, 0), (8, 45), "Math"),
            event(15, (8, 45), (9, 30), "Math"),
            event(15, (9, 30), (10, 15), "Math"),
            event(15, (10, 15), (11, 0), "Physics"),
            event(16, (8, 0), (8, 45), "Physics"),
        ];

        let once = merge_consecutive(events);
        let twice = merge_consecutive(once.clone());

        assert_eq!(once, twice);
        assert!(once.windows(2).all(|w| !should_merge(&w[0], &w[1])));
    }

    #[test]
    fn empty_and_single_inputs_pass_through() {
        assert!(merge_consecutive(Vec::new()).is_empty());

        let single = vec![event(15, (8, 0), (8, 45), "Math")];
        assert_eq!(merge_consecutive(single.clone()), single);
    }

    #[test]
    fn double_period_from_raw_lessons() {
        let period = |start, end| RawLesson {
            date: 20240315,
            start_time: start,
            end_time: end,
            subjects: vec![NamedElement::new("Math")],
            rooms: vec![NamedElement::new("101")],
            ..Default::default()
        };

        let merged = merge_consecutive(map_lessons(&[period(800, 845), period(845, 930)]));

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start.as_tuple(), (2024, 3, 15, 8, 0));
        assert_eq!(merged[0].end.as_tuple(), (2024, 3, 15, 9, 30));
        assert_eq!(merged[0].title, "Math");
        assert_eq!(merged[0].location, "101");
    }
}
