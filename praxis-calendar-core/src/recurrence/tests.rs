use super::*;
use crate::{EventType, Priority};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn window(start: NaiveDate, end: NaiveDate) -> DateWindow {
    DateWindow::new(start, end).unwrap()
}

fn event(id: &str, start: NaiveDate, end: NaiveDate, rule: RecurrenceType) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        practice_id: "praxis-1".to_string(),
        created_by: "user-1".to_string(),
        title: format!("Termin {id}"),
        start_date: start,
        end_date: end,
        start_time: "09:00".to_string(),
        end_time: "10:00".to_string(),
        event_type: EventType::Meeting,
        priority: Priority::Medium,
        recurrence_type: rule,
        ..Default::default()
    }
}

fn instances(expanded: &[CalendarEvent]) -> Vec<&CalendarEvent> {
    expanded.iter().filter(|e| e.is_recurring_instance).collect()
}

#[test]
fn non_recurring_event_passes_through() {
    let single = event("a", date(2025, 3, 1), date(2025, 3, 1), RecurrenceType::None);

    for w in [
        window(date(2020, 1, 1), date(2020, 12, 31)),
        window(date(2025, 1, 1), date(2025, 12, 31)),
        window(date(2030, 1, 1), date(2030, 1, 1)),
    ] {
        let expanded = expand(std::slice::from_ref(&single), &w);
        assert_eq!(expanded, vec![single.clone()]);
    }
}

#[test]
fn recurrence_end_date_is_ignored_without_rule() {
    let mut single = event("a", date(2025, 3, 1), date(2025, 3, 1), RecurrenceType::None);
    single.recurrence_end_date = Some(date(2025, 12, 31));

    let expanded = expand(&[single], &window(date(2025, 1, 1), date(2025, 12, 31)));
    assert_eq!(expanded.len(), 1);
}

#[test]
fn daily_rule_without_end_is_capped() {
    let daily = event("d", date(2025, 1, 1), date(2025, 1, 1), RecurrenceType::Daily);

    let expanded = expand(&[daily], &window(date(2025, 1, 1), date(2034, 12, 31)));

    assert_eq!(expanded.len(), 366);
    assert_eq!(instances(&expanded).len(), MAX_INSTANCES_PER_EVENT as usize);
    assert!(!expanded[0].is_recurring_instance);
    assert_eq!(expanded.last().unwrap().start_date, date(2026, 1, 1));
}

#[test]
fn cap_applies_per_source_event() {
    let events = vec![
        event("a", date(2025, 1, 1), date(2025, 1, 1), RecurrenceType::Daily),
        event("b", date(2025, 1, 1), date(2025, 1, 1), RecurrenceType::Weekly),
    ];

    let expanded = expand(&events, &window(date(2025, 1, 1), date(2040, 1, 1)));

    assert_eq!(expanded.len(), 2 + 2 * MAX_INSTANCES_PER_EVENT as usize);
}

#[test]
fn multi_day_span_is_preserved() {
    let weekly = event("w", date(2025, 1, 1), date(2025, 1, 3), RecurrenceType::Weekly);

    let expanded = expand(&[weekly], &window(date(2025, 1, 1), date(2025, 1, 8)));
    let generated = instances(&expanded);

    assert_eq!(generated.len(), 1);
    assert_eq!(generated[0].start_date, date(2025, 1, 8));
    assert_eq!(generated[0].end_date, date(2025, 1, 10));
}

#[test]
fn recurrence_end_date_bounds_generation() {
    let mut monthly = event("m", date(2025, 1, 15), date(2025, 1, 15), RecurrenceType::Monthly);
    monthly.recurrence_end_date = Some(date(2025, 3, 15));

    let expanded = expand(&[monthly], &window(date(2025, 1, 1), date(2025, 12, 31)));
    let starts: Vec<_> = instances(&expanded).iter().map(|e| e.start_date).collect();

    assert_eq!(starts, vec![date(2025, 2, 15), date(2025, 3, 15)]);
}

#[test]
fn window_end_wins_over_later_recurrence_end() {
    let mut weekly = event("w", date(2025, 1, 6), date(2025, 1, 6), RecurrenceType::Weekly);
    weekly.recurrence_end_date = Some(date(2025, 12, 31));

    let expanded = expand(&[weekly], &window(date(2025, 1, 1), date(2025, 1, 31)));
    let starts: Vec<_> = instances(&expanded).iter().map(|e| e.start_date).collect();

    assert_eq!(
        starts,
        vec![date(2025, 1, 13), date(2025, 1, 20), date(2025, 1, 27)]
    );
}

#[test]
fn instances_before_window_start_are_kept() {
    let weekly = event("w", date(2025, 1, 1), date(2025, 1, 1), RecurrenceType::Weekly);

    let expanded = expand(&[weekly], &window(date(2025, 6, 1), date(2025, 12, 31)));
    let early: Vec<_> = instances(&expanded)
        .into_iter()
        .filter(|e| e.start_date < date(2025, 6, 1))
        .collect();

    assert_eq!(early.first().unwrap().start_date, date(2025, 1, 8));
    assert_eq!(early.len(), 21);
}

#[test]
fn instance_ids_trace_back_to_parent() {
    let daily = event("evt-42", date(2025, 5, 1), date(2025, 5, 1), RecurrenceType::Daily);

    let expanded = expand(&[daily], &window(date(2025, 5, 1), date(2025, 5, 10)));

    for instance in instances(&expanded) {
        let expected = format!("evt-42-instance-{}", instance.start_date.format("%Y-%m-%d"));
        assert_eq!(instance.id, expected);
        assert_eq!(canonical_id(&instance.id), "evt-42");
        assert_eq!(instance.parent_event_id.as_deref(), Some("evt-42"));
    }
}

#[test]
fn instances_inherit_parent_fields() {
    let mut weekly = event("w", date(2025, 2, 3), date(2025, 2, 3), RecurrenceType::Weekly);
    weekly.location = Some("Behandlungsraum 2".to_string());
    weekly.attendees = vec!["u1".to_string(), "u2".to_string()];

    let expanded = expand(&[weekly.clone()], &window(date(2025, 2, 1), date(2025, 2, 28)));

    for instance in instances(&expanded) {
        assert_eq!(instance.title, weekly.title);
        assert_eq!(instance.location, weekly.location);
        assert_eq!(instance.attendees, weekly.attendees);
        assert_eq!(instance.recurrence_type, RecurrenceType::Weekly);
        assert_eq!(instance.start_time, "09:00");
    }
}

#[test]
fn expanding_twice_duplicates_instances() {
    let weekly = event("w", date(2025, 1, 6), date(2025, 1, 6), RecurrenceType::Weekly);
    let w = window(date(2025, 1, 1), date(2025, 1, 31));

    let once = expand(std::slice::from_ref(&weekly), &w);
    let twice = expand(&[weekly.clone(), weekly], &w);

    assert_eq!(twice.len(), once.len() * 2);
}

#[test]
fn monthly_rule_clamps_to_short_months() {
    let monthly = event("m", date(2025, 1, 31), date(2025, 1, 31), RecurrenceType::Monthly);

    let expanded = expand(&[monthly], &window(date(2025, 1, 1), date(2025, 5, 31)));
    let starts: Vec<_> = instances(&expanded).iter().map(|e| e.start_date).collect();

    assert_eq!(
        starts,
        vec![
            date(2025, 2, 28),
            date(2025, 3, 31),
            date(2025, 4, 30),
            date(2025, 5, 31)
        ]
    );
}

#[test]
fn yearly_rule_handles_leap_day() {
    let yearly = event("y", date(2024, 2, 29), date(2024, 2, 29), RecurrenceType::Yearly);

    let expanded = expand(&[yearly], &window(date(2024, 1, 1), date(2028, 12, 31)));
    let starts: Vec<_> = instances(&expanded).iter().map(|e| e.start_date).collect();

    assert_eq!(
        starts,
        vec![
            date(2025, 2, 28),
            date(2026, 2, 28),
            date(2027, 2, 28),
            date(2028, 2, 29)
        ]
    );
}

#[test]
fn window_constructors() {
    assert!(DateWindow::new(date(2025, 2, 1), date(2025, 1, 1)).is_err());

    let around = DateWindow::around(date(2025, 5, 31), 3);
    assert_eq!(around.start, date(2025, 2, 28));
    assert_eq!(around.end, date(2025, 8, 31));

    let following = DateWindow::following(date(2025, 12, 28), 7);
    assert_eq!(following.end, date(2026, 1, 4));
    assert!(following.contains(date(2026, 1, 4)));
    assert!(!following.contains(date(2025, 12, 27)));
}

#[test]
fn canonical_id_leaves_plain_ids_alone() {
    assert_eq!(canonical_id("abc"), "abc");
    assert_eq!(canonical_id("abc-instance-2025-01-01"), "abc");
}
