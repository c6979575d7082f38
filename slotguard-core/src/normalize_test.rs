#[cfg(test)]
mod tests {
    use crate::error::ScheduleError;
    use crate::normalize::{normalize_slot, parse_clock_time, parse_day_of_week, parse_time_to_minutes};
    use crate::segment::{Segment, split};
    use crate::types::{MINUTES_PER_DAY, Weekday};

    // =========================================================================
    // Day tokens
    // =========================================================================

    #[test]
    fn day_names_are_case_insensitive() {
        assert_eq!(parse_day_of_week("Tuesday").unwrap(), Weekday::Tuesday);
        assert_eq!(parse_day_of_week("tuesday").unwrap(), Weekday::Tuesday);
        assert_eq!(parse_day_of_week("  SUNDAY ").unwrap(), Weekday::Sunday);
        assert_eq!(parse_day_of_week("saturday").unwrap().index(), 6);
    }

    #[test]
    fn unknown_day_is_invalid_input() {
        for token in ["Tue", "2", "", "Funday"] {
            assert!(
                matches!(parse_day_of_week(token), Err(ScheduleError::InvalidInput(_))),
                "{:?} should be rejected",
                token
            );
        }
    }

    #[test]
    fn weekday_next_wraps_to_sunday() {
        assert_eq!(Weekday::Saturday.next(), Weekday::Sunday);
        assert_eq!(Weekday::Sunday.next(), Weekday::Monday);
    }

    // =========================================================================
    // Time tokens
    // =========================================================================

    #[test]
    fn parses_minutes_of_day() {
        assert_eq!(parse_time_to_minutes("00:00").unwrap(), 0);
        assert_eq!(parse_time_to_minutes("9:30").unwrap(), 570);
        assert_eq!(parse_time_to_minutes("10:00:00").unwrap(), 600);
        assert_eq!(parse_time_to_minutes("23:59").unwrap(), 1439);
    }

    #[test]
    fn non_zero_seconds_round_up() {
        assert_eq!(parse_time_to_minutes("10:00:01").unwrap(), 601);
        assert_eq!(parse_time_to_minutes("10:00:59").unwrap(), 601);
        assert_eq!(parse_time_to_minutes("23:59:30").unwrap(), MINUTES_PER_DAY);
    }

    #[test]
    fn malformed_times_are_rejected() {
        for token in ["24:00", "12:60", "12:00:60", "1200", "12:0", "123:00", "ab:cd", "12:00:00:00", ""] {
            assert!(
                matches!(parse_clock_time(token), Err(ScheduleError::InvalidInput(_))),
                "{:?} should be rejected",
                token
            );
        }
    }

    #[test]
    fn clock_time_displays_with_seconds() {
        assert_eq!(parse_clock_time("9:05").unwrap().to_string(), "09:05:00");
    }

    // =========================================================================
    // Slot normalization
    // =========================================================================

    #[test]
    fn zero_length_slot_is_rejected() {
        assert!(matches!(
            normalize_slot("Monday", "10:00", "10:00:00"),
            Err(ScheduleError::InvalidInput(_))
        ));
        // Both round to minute 601
        assert!(matches!(
            normalize_slot("Monday", "10:00:30", "10:01"),
            Err(ScheduleError::InvalidInput(_))
        ));
        // 23:59:30 rounds to midnight
        assert!(matches!(
            normalize_slot("Monday", "23:59:30", "00:00"),
            Err(ScheduleError::InvalidInput(_))
        ));
        assert!(normalize_slot("Monday", "00:00", "23:59:30").is_ok());
    }

    #[test]
    fn overnight_slot_is_kept_raw() {
        let spec = normalize_slot("Friday", "22:00", "02:00").unwrap();
        assert!(spec.crosses_midnight());
        assert_eq!(spec.start_minute(), 1320);
        assert_eq!(spec.end_minute(), 120);
    }

    // =========================================================================
    // Segmentation
    // =========================================================================

    #[test]
    fn same_day_interval_yields_one_identical_segment() {
        for day in Weekday::ALL {
            for (start, end) in [(0, 1), (600, 720), (0, MINUTES_PER_DAY), (1439, MINUTES_PER_DAY)] {
                let segments = split(day, start, end).unwrap();
                assert_eq!(segments.as_slice(), &[Segment::new(day, start, end)]);
            }
        }
    }

    #[test]
    fn wrapping_interval_yields_tail_and_head() {
        for day in Weekday::ALL {
            let segments = split(day, 1320, 120).unwrap();
            assert_eq!(
                segments.as_slice(),
                &[
                    Segment::new(day, 1320, MINUTES_PER_DAY),
                    Segment::new(day.next(), 0, 120),
                ]
            );
        }
    }

    #[test]
    fn split_rejects_zero_length() {
        assert!(split(Weekday::Monday, 600, 600).is_err());
    }
}
