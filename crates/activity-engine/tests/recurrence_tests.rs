//! Recurrence rule vectors: built-in frequencies and RFC 5545 custom patterns.

use activity_engine::{
    ActivityError, Recurrence, RecurrenceKind, RecurrenceRule, RecurringSchedule, SiteCalendar,
};
use chrono::{NaiveDate, Weekday};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Evaluate `rule` for `date` at local midnight in `zone`.
fn includes(rule: &RecurrenceRule, zone: &str, date: NaiveDate) -> bool {
    let cal = SiteCalendar::from_name(zone).unwrap();
    rule.includes(&cal.start_of_day(date))
        .expect("rule should evaluate")
}

fn custom(rrule: &str, dtstart: NaiveDate) -> RecurrenceRule {
    RecurrenceRule::Custom {
        rrule: rrule.to_string(),
        dtstart,
        exdates: vec![],
    }
}

// ===========================================================================
// Built-in frequencies
// ===========================================================================

#[test]
fn daily_includes_every_day() {
    let rule = RecurrenceRule::Daily;
    for d in 1..=31 {
        assert!(includes(&rule, "UTC", day(2024, 12, d)));
    }
}

#[test]
fn weekly_multiple_days() {
    let rule = RecurrenceRule::Weekly {
        days: vec![Weekday::Tue, Weekday::Thu],
    };
    // Week of 2024-07-01 (Monday).
    let expected = [false, true, false, true, false, false, false];
    for (offset, want) in expected.iter().enumerate() {
        let date = day(2024, 7, 1 + offset as u32);
        assert_eq!(includes(&rule, "America/Chicago", date), *want, "{}", date);
    }
}

#[test]
fn biweekly_alternates_weeks_from_anchor() {
    // 2024-01-02 is a Tuesday.
    let rule = RecurrenceRule::Biweekly {
        anchor: day(2024, 1, 2),
        days: vec![Weekday::Tue],
    };
    assert!(includes(&rule, "UTC", day(2024, 1, 2)));
    assert!(!includes(&rule, "UTC", day(2024, 1, 9)));
    assert!(includes(&rule, "UTC", day(2024, 1, 16)));
    assert!(!includes(&rule, "UTC", day(2024, 1, 17)), "Wednesday");
    // Weeks before the anchor alternate the same way.
    assert!(!includes(&rule, "UTC", day(2023, 12, 26)));
    assert!(includes(&rule, "UTC", day(2023, 12, 19)));
}

#[test]
fn biweekly_counts_weeks_not_days_from_anchor() {
    // Anchor on a Friday; the following Monday is already in the next week.
    let rule = RecurrenceRule::Biweekly {
        anchor: day(2024, 3, 1),
        days: vec![Weekday::Mon, Weekday::Fri],
    };
    assert!(includes(&rule, "UTC", day(2024, 2, 26)), "Monday of anchor week");
    assert!(!includes(&rule, "UTC", day(2024, 3, 4)), "Monday of the off week");
    assert!(includes(&rule, "UTC", day(2024, 3, 11)));
}

#[test]
fn monthly_first_and_fifteenth() {
    let rule = RecurrenceRule::Monthly { days: vec![1, 15] };
    assert!(includes(&rule, "UTC", day(2024, 2, 1)));
    assert!(includes(&rule, "UTC", day(2024, 2, 15)));
    assert!(!includes(&rule, "UTC", day(2024, 2, 16)));
}

#[test]
fn monthly_thirty_first_skips_short_months() {
    let rule = RecurrenceRule::Monthly { days: vec![31] };
    assert!(includes(&rule, "UTC", day(2024, 3, 31)));
    assert!(!includes(&rule, "UTC", day(2024, 4, 30)));
    assert!(!includes(&rule, "UTC", day(2024, 5, 1)));
}

#[test]
fn monthly_last_day() {
    let rule = RecurrenceRule::Monthly { days: vec![-1] };
    assert!(includes(&rule, "UTC", day(2024, 2, 29)));
    assert!(includes(&rule, "UTC", day(2023, 2, 28)));
    assert!(includes(&rule, "UTC", day(2024, 4, 30)));
    assert!(!includes(&rule, "UTC", day(2024, 3, 30)));
}

// ===========================================================================
// Custom RFC 5545 patterns
// ===========================================================================

#[test]
fn second_and_fourth_tuesday() {
    // October 2024 starts on a Tuesday: 1, 8, 15, 22, 29.
    let rule = custom("FREQ=MONTHLY;BYDAY=2TU,4TU", day(2024, 1, 1));
    let zone = "America/Chicago";
    assert!(!includes(&rule, zone, day(2024, 10, 1)));
    assert!(includes(&rule, zone, day(2024, 10, 8)));
    assert!(!includes(&rule, zone, day(2024, 10, 15)));
    assert!(includes(&rule, zone, day(2024, 10, 22)));
    assert!(!includes(&rule, zone, day(2024, 10, 29)));
    assert!(!includes(&rule, zone, day(2024, 10, 9)), "Wednesday");
}

#[test]
fn custom_weekly_matches_builtin_weekly() {
    let custom_rule = custom("FREQ=WEEKLY;BYDAY=MO", day(2024, 1, 1));
    let builtin = RecurrenceRule::Weekly {
        days: vec![Weekday::Mon],
    };
    for d in 1..=31 {
        let date = day(2024, 7, d);
        assert_eq!(
            includes(&custom_rule, "Europe/Berlin", date),
            includes(&builtin, "Europe/Berlin", date),
            "{}",
            date
        );
    }
}

#[test]
fn custom_rule_accepts_rrule_prefix() {
    let rule = custom("RRULE:FREQ=DAILY;INTERVAL=2", day(2024, 5, 1));
    assert!(includes(&rule, "UTC", day(2024, 5, 1)));
    assert!(!includes(&rule, "UTC", day(2024, 5, 2)));
    assert!(includes(&rule, "UTC", day(2024, 5, 3)));
}

#[test]
fn custom_rule_has_no_occurrences_before_dtstart() {
    let rule = custom("FREQ=DAILY", day(2024, 6, 1));
    assert!(!includes(&rule, "UTC", day(2024, 5, 31)));
    assert!(includes(&rule, "UTC", day(2024, 6, 1)));
}

#[test]
fn custom_rule_respects_count() {
    let rule = custom("FREQ=WEEKLY;BYDAY=MO;COUNT=2", day(2024, 7, 1));
    assert!(includes(&rule, "UTC", day(2024, 7, 1)));
    assert!(includes(&rule, "UTC", day(2024, 7, 8)));
    assert!(!includes(&rule, "UTC", day(2024, 7, 15)));
}

#[test]
fn custom_rule_skips_exception_dates() {
    let rule = RecurrenceRule::Custom {
        rrule: "FREQ=WEEKLY;BYDAY=MO".to_string(),
        dtstart: day(2024, 7, 1),
        exdates: vec![day(2024, 7, 8)],
    };
    let zone = "America/New_York";
    assert!(includes(&rule, zone, day(2024, 7, 1)));
    assert!(!includes(&rule, zone, day(2024, 7, 8)));
    assert!(includes(&rule, zone, day(2024, 7, 15)));
}

#[test]
fn custom_daily_on_dst_transition_days() {
    let rule = custom("FREQ=DAILY", day(2024, 1, 1));
    let zone = "America/New_York";
    // Spring forward (23-hour day) and fall back (25-hour day).
    assert!(includes(&rule, zone, day(2024, 3, 10)));
    assert!(includes(&rule, zone, day(2024, 3, 11)));
    assert!(includes(&rule, zone, day(2024, 11, 3)));
    assert!(includes(&rule, zone, day(2024, 11, 4)));
}

#[test]
fn custom_daily_includes_day_whose_midnight_is_skipped() {
    // Sao Paulo sprang forward at local midnight on 2018-11-04; 00:00 never
    // happened that day.
    let rule = custom("FREQ=DAILY", day(2018, 10, 1));
    let zone = "America/Sao_Paulo";
    assert!(includes(&rule, zone, day(2018, 11, 3)));
    assert!(includes(&rule, zone, day(2018, 11, 4)));
    assert!(includes(&rule, zone, day(2018, 11, 5)));
    // Fall back at midnight: 2019-02-16 23:00 happened twice.
    assert!(includes(&rule, zone, day(2019, 2, 16)));
    assert!(includes(&rule, zone, day(2019, 2, 17)));
}

#[test]
fn custom_rule_starting_on_skipped_midnight_evaluates() {
    let rule = custom("FREQ=DAILY", day(2018, 11, 4));
    let zone = "America/Sao_Paulo";
    assert!(rule.validate().is_ok());
    assert!(!includes(&rule, zone, day(2018, 11, 3)));
    assert!(includes(&rule, zone, day(2018, 11, 4)));
    assert!(includes(&rule, zone, day(2018, 11, 5)));
}

#[test]
fn custom_weekly_matches_builtin_across_midnight_transition() {
    // Santiago moved from 00:00 to 01:00 on Sunday 2024-09-08.
    let custom_rule = custom("FREQ=WEEKLY;BYDAY=SU", day(2024, 1, 1));
    let builtin = RecurrenceRule::Weekly {
        days: vec![Weekday::Sun],
    };
    let zone = "America/Santiago";
    assert!(includes(&custom_rule, zone, day(2024, 9, 8)));
    for d in 1..=30 {
        let date = day(2024, 9, d);
        assert_eq!(
            includes(&custom_rule, zone, date),
            includes(&builtin, zone, date),
            "{}",
            date
        );
    }
}

#[test]
fn exception_date_on_skipped_midnight_is_excluded() {
    let rule = RecurrenceRule::Custom {
        rrule: "FREQ=DAILY".to_string(),
        dtstart: day(2018, 10, 1),
        exdates: vec![day(2018, 11, 4)],
    };
    let zone = "America/Sao_Paulo";
    assert!(includes(&rule, zone, day(2018, 11, 3)));
    assert!(!includes(&rule, zone, day(2018, 11, 4)));
    assert!(includes(&rule, zone, day(2018, 11, 5)));
}

#[test]
fn custom_rule_is_evaluated_in_site_zone_not_utc() {
    // Fridays in Auckland. Local midnight on a Friday is Thursday in UTC, so a
    // zone mix-up would shift the answer by a day.
    let rule = custom("FREQ=WEEKLY;BYDAY=FR", day(2024, 1, 1));
    assert!(includes(&rule, "Pacific/Auckland", day(2024, 7, 5)));
    assert!(!includes(&rule, "Pacific/Auckland", day(2024, 7, 4)));
    assert!(!includes(&rule, "Pacific/Auckland", day(2024, 7, 6)));
}

#[test]
fn malformed_custom_rule_is_an_evaluation_error() {
    let rule = custom("FREQ=SOMETIMES", day(2024, 1, 1));
    let cal = SiteCalendar::default();
    let result = rule.includes(&cal.start_of_day(day(2024, 2, 1)));
    assert!(matches!(result, Err(ActivityError::RuleEvaluation(_))));
}

#[test]
fn empty_custom_rule_is_an_evaluation_error() {
    let rule = custom("", day(2024, 1, 1));
    let cal = SiteCalendar::default();
    let result = rule.includes(&cal.start_of_day(day(2024, 2, 1)));
    assert!(matches!(result, Err(ActivityError::RuleEvaluation(_))));
}

// ===========================================================================
// Validation, classification, serialization
// ===========================================================================

#[test]
fn validate_reports_structural_problems() {
    let bad = [
        RecurrenceRule::Weekly { days: vec![] },
        RecurrenceRule::Biweekly {
            anchor: day(2024, 1, 1),
            days: vec![],
        },
        RecurrenceRule::Monthly { days: vec![] },
        RecurrenceRule::Monthly { days: vec![0] },
        RecurrenceRule::Monthly { days: vec![32] },
        custom("FREQ=SOMETIMES", day(2024, 1, 1)),
    ];
    for rule in &bad {
        assert!(
            matches!(rule.validate(), Err(ActivityError::InvalidRule(_))),
            "{:?} should be invalid",
            rule
        );
    }

    assert!(RecurrenceRule::Daily.validate().is_ok());
    assert!(RecurrenceRule::Monthly { days: vec![-1, 31] }
        .validate()
        .is_ok());
    assert!(custom("FREQ=MONTHLY;BYDAY=2TU,4TU", day(2024, 1, 1))
        .validate()
        .is_ok());
}

#[test]
fn zero_month_day_fails_at_evaluation_too() {
    let schedule = RecurringSchedule::ongoing(day(2024, 1, 1))
        .with_recurrence(RecurrenceRule::Monthly { days: vec![0] });
    assert!(matches!(
        schedule.is_active_on(day(2024, 1, 5), &SiteCalendar::default()),
        Err(ActivityError::RuleEvaluation(_))
    ));
}

#[test]
fn kinds_and_labels() {
    assert_eq!(RecurrenceRule::Daily.kind(), RecurrenceKind::Daily);
    assert_eq!(
        custom("FREQ=DAILY", day(2024, 1, 1)).kind(),
        RecurrenceKind::Custom
    );
    assert_eq!(RecurrenceKind::Biweekly.to_string(), "Bi-weekly");
    assert_eq!(RecurrenceKind::Custom.to_string(), "Custom Pattern");
    assert_eq!(
        RecurrenceRule::Weekly {
            days: vec![Weekday::Mon, Weekday::Fri]
        }
        .to_string(),
        "Weekly on Mon, Fri"
    );
}

#[test]
fn rules_deserialize_from_tagged_json() {
    let weekly: RecurrenceRule =
        serde_json::from_str(r#"{"type":"weekly","days":["Mon","Wed"]}"#).unwrap();
    assert_eq!(
        weekly,
        RecurrenceRule::Weekly {
            days: vec![Weekday::Mon, Weekday::Wed]
        }
    );

    let custom_rule: RecurrenceRule = serde_json::from_str(
        r#"{"type":"custom","rrule":"FREQ=MONTHLY;BYDAY=2TU,4TU","dtstart":"2024-01-01"}"#,
    )
    .unwrap();
    assert_eq!(custom_rule, custom("FREQ=MONTHLY;BYDAY=2TU,4TU", day(2024, 1, 1)));

    let daily: RecurrenceRule = serde_json::from_str(r#"{"type":"daily"}"#).unwrap();
    assert_eq!(daily, RecurrenceRule::Daily);
}
