use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{CalendarEvent, Error, IcsOptions, Result};

#[cfg(test)]
mod tests;

/// Content lines longer than this many octets are folded
const MAX_LINE_OCTETS: usize = 75;

/// Encodes calendar events as an iCalendar (RFC 5545) document
pub struct IcsGenerator {
    options: IcsOptions,
}

impl IcsGenerator {
    pub fn new(options: IcsOptions) -> Self {
        Self { options }
    }

    /// Encode `events` as one calendar.
    ///
    /// Events whose boundaries are not a real local date-time, or that end
    /// before they start, are skipped with a warning. Fails if events were
    /// given but none of them could be encoded.
    pub fn generate(&self, events: &[CalendarEvent], generated_at: DateTime<Utc>) -> Result<String> {
        let mut ics_content = String::new();

        push_line(&mut ics_content, "BEGIN:VCALENDAR");
        push_line(&mut ics_content, "VERSION:2.0");
        push_line(&mut ics_content, &format!("PRODID:{}", self.options.product_id));
        push_line(&mut ics_content, "CALSCALE:GREGORIAN");
        push_line(
            &mut ics_content,
            &format!("METHOD:{}", self.options.method.as_str()),
        );

        if let Some(ref name) = self.options.calendar_name {
            push_line(
                &mut ics_content,
                &format!("X-WR-CALNAME:{}", escape_text(name)),
            );
        }

        let dtstamp = generated_at.format("%Y%m%dT%H%M%SZ").to_string();
        let mut encoded = 0;
        for event in events {
            match validate_bounds(event) {
                Ok((start, end)) => {
                    Self::add_event(&mut ics_content, event, start, end, &dtstamp);
                    encoded += 1;
                }
                Err(e) => tracing::warn!("Skipping event: {}", e),
            }
        }

        if encoded == 0 && !events.is_empty() {
            return Err(Error::IcsGeneration(format!(
                "none of the {} events has valid dates",
                events.len()
            )));
        }

        push_line(&mut ics_content, "END:VCALENDAR");

        Ok(ics_content)
    }

    fn add_event(
        ics_content: &mut String,
        event: &CalendarEvent,
        start: NaiveDateTime,
        end: NaiveDateTime,
        dtstamp: &str,
    ) {
        push_line(ics_content, "BEGIN:VEVENT");
        push_line(ics_content, &format!("UID:{}", escape_text(&event.uid)));
        push_line(ics_content, &format!("SEQUENCE:{}", event.sequence));
        push_line(ics_content, &format!("DTSTAMP:{dtstamp}"));
        push_line(ics_content, &format!("DTSTART:{}", format_local(start)));
        push_line(ics_content, &format!("DTEND:{}", format_local(end)));
        push_line(
            ics_content,
            &format!("SUMMARY:{}", escape_text(&event.title)),
        );
        push_line(
            ics_content,
            &format!("LOCATION:{}", escape_text(&event.location)),
        );
        if !event.description.is_empty() {
            push_line(
                ics_content,
                &format!("DESCRIPTION:{}", escape_text(&event.description)),
            );
        }
        push_line(ics_content, "END:VEVENT");
    }
}

impl Default for IcsGenerator {
    fn default() -> Self {
        Self::new(IcsOptions::default())
    }
}

fn validate_bounds(event: &CalendarEvent) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let start = event.start.to_naive().ok_or_else(|| {
        Error::IcsGeneration(format!(
            "event {} has an invalid start {:?}",
            event.uid,
            event.start.as_tuple()
        ))
    })?;
    let end = event.end.to_naive().ok_or_else(|| {
        Error::IcsGeneration(format!(
            "event {} has an invalid end {:?}",
            event.uid,
            event.end.as_tuple()
        ))
    })?;

    if end < start {
        return Err(Error::IcsGeneration(format!(
            "event {} ends at {end} before it starts at {start}",
            event.uid
        )));
    }

    Ok((start, end))
}

/// Floating local time, no `Z` and no `TZID`
fn format_local(value: NaiveDateTime) -> String {
    value.format("%Y%m%dT%H%M%S").to_string()
}

/// Escape a TEXT property value
fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace("\r\n", "\n")
        .replace('\r', "")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// Append `line` with CRLF, folding at 75 octets without splitting a character
fn push_line(out: &mut String, line: &str) {
    let mut width = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            // The leading space counts towards the continuation line.
            width = 1;
        }
        out.push(ch);
        width += len;
    }
    out.push_str("\r\n");
}
