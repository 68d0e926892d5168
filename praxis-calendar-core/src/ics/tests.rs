use super::*;
use crate::{EventType, RecurrenceType, recurrence::{DateWindow, expand}};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn meeting() -> CalendarEvent {
    CalendarEvent {
        id: "evt-1".to_string(),
        practice_id: "praxis-1".to_string(),
        title: "Teambesprechung, Raum 2".to_string(),
        description: Some("Agenda:\nQM; Dienstplan".to_string()),
        start_date: date(2025, 1, 6),
        end_date: date(2025, 1, 6),
        start_time: "08:30".to_string(),
        end_time: "09:15".to_string(),
        event_type: EventType::Meeting,
        priority: Priority::High,
        location: Some("Praxis Süd".to_string()),
        recurrence_type: RecurrenceType::Weekly,
        recurrence_end_date: Some(date(2025, 6, 30)),
        ..Default::default()
    }
}

#[test]
fn renders_timed_recurring_event() {
    let generator = IcsGenerator::default();
    let ics_content = generator.generate(&[meeting()]).expect("ICS generation failed");

    assert!(ics_content.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(ics_content.ends_with("END:VCALENDAR\r\n"));
    assert!(ics_content.contains("X-WR-CALNAME:Praxiskalender\r\n"));
    assert!(ics_content.contains("UID:evt-1@effizienz-praxis\r\n"));
    assert!(ics_content.contains("DTSTART;TZID=Europe/Berlin:20250106T083000\r\n"));
    assert!(ics_content.contains("DTEND;TZID=Europe/Berlin:20250106T091500\r\n"));
    assert!(ics_content.contains("SUMMARY:Teambesprechung\\, Raum 2\r\n"));
    assert!(ics_content.contains("DESCRIPTION:Agenda:\\nQM\\; Dienstplan\r\n"));
    assert!(ics_content.contains("LOCATION:Praxis Süd\r\n"));
    assert!(ics_content.contains("RRULE:FREQ=WEEKLY;UNTIL=20250630T235959Z\r\n"));
    assert!(ics_content.contains("PRIORITY:1\r\n"));
    assert!(ics_content.contains("CATEGORIES:MEETING\r\n"));
    assert!(!ics_content.contains("BEGIN:VALARM"));
}

#[test]
fn all_day_events_use_exclusive_date_end() {
    let vacation = CalendarEvent {
        id: "urlaub".to_string(),
        title: "Betriebsferien".to_string(),
        start_date: date(2025, 7, 28),
        end_date: date(2025, 8, 8),
        is_all_day: true,
        event_type: EventType::Holiday,
        ..Default::default()
    };

    let ics_content = IcsGenerator::default().generate(&[vacation]).unwrap();

    assert!(ics_content.contains("DTSTART;VALUE=DATE:20250728\r\n"));
    assert!(ics_content.contains("DTEND;VALUE=DATE:20250809\r\n"));
    assert!(!ics_content.contains("RRULE"));
}

#[test]
fn until_matches_dtstart_value_type() {
    let timed = IcsGenerator::default().generate(&[meeting()]).unwrap();
    let rrule = timed.lines().find(|l| l.starts_with("RRULE:")).unwrap();
    let until = rrule.split("UNTIL=").nth(1).unwrap();
    assert!(until.ends_with('Z'), "timed UNTIL must be UTC, got {until}");
    assert_eq!(until.len(), "20250630T235959Z".len());

    let closing = CalendarEvent {
        id: "abschluss".to_string(),
        title: "Monatsabschluss".to_string(),
        start_date: date(2025, 1, 31),
        end_date: date(2025, 1, 31),
        is_all_day: true,
        recurrence_type: RecurrenceType::Monthly,
        recurrence_end_date: Some(date(2025, 12, 31)),
        ..Default::default()
    };
    let all_day = IcsGenerator::default().generate(&[closing]).unwrap();
    assert!(all_day.contains("DTSTART;VALUE=DATE:20250131\r\n"));
    assert!(all_day.contains("RRULE:FREQ=MONTHLY;UNTIL=20251231\r\n"));
}

#[test]
fn unparsable_times_fall_back_to_all_day() {
    let event = CalendarEvent {
        id: "x".to_string(),
        title: "Ohne Uhrzeit".to_string(),
        start_date: date(2025, 3, 3),
        end_date: date(2025, 3, 3),
        start_time: "morgens".to_string(),
        ..Default::default()
    };

    let ics_content = IcsGenerator::default().generate(&[event]).unwrap();
    assert!(ics_content.contains("DTSTART;VALUE=DATE:20250303\r\n"));
}

#[test]
fn virtual_instances_are_not_exported() {
    let window = DateWindow::new(date(2025, 1, 1), date(2025, 3, 31)).unwrap();
    let expanded = expand(&[meeting()], &window);
    assert!(expanded.len() > 1);

    let ics_content = IcsGenerator::default().generate(&expanded).unwrap();
    assert_eq!(ics_content.matches("BEGIN:VEVENT").count(), 1);
}

#[test]
fn reminder_and_options() {
    let options = IcsOptions {
        calendar_name: Some("Praxis Dr. Weber".to_string()),
        timezone: "Europe/Vienna".to_string(),
        include_description: false,
        reminder_minutes: Some(30),
    };

    let ics_content = IcsGenerator::new(options).generate(&[meeting()]).unwrap();

    assert!(ics_content.contains("X-WR-CALNAME:Praxis Dr. Weber\r\n"));
    assert!(ics_content.contains("X-WR-TIMEZONE:Europe/Vienna\r\n"));
    assert!(ics_content.contains("DTSTART;TZID=Europe/Vienna:20250106T083000\r\n"));
    assert!(!ics_content.contains("DESCRIPTION:Agenda"));
    assert!(ics_content.contains("TRIGGER:-PT30M\r\n"));
}

#[test]
fn parses_short_and_long_times() {
    assert_eq!(parse_time("07:05"), NaiveTime::from_hms_opt(7, 5, 0));
    assert_eq!(parse_time("17:45:30"), NaiveTime::from_hms_opt(17, 45, 30));
    assert_eq!(parse_time(""), None);
}
