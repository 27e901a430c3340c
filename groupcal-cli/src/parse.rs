//! Argument parsers shared by the event commands.

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveTime, Weekday};
use groupcal_core::recurrence::weekday_from_index;

/// Parse `YYYY-MM-DD`.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow!("Could not parse date: \"{input}\" (expected YYYY-MM-DD)"))
}

/// Parse a wall-clock time: `14:30`, `14:30:00`, `2:30pm` or `9am`.
pub fn parse_time(input: &str) -> Result<NaiveTime> {
    let mut cleaned = input.trim().to_lowercase().replace(' ', "");
    if !cleaned.contains(':') {
        let hour_end = cleaned
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(cleaned.len());
        cleaned.insert_str(hour_end, ":00");
    }

    ["%H:%M", "%H:%M:%S", "%I:%M%P"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&cleaned, fmt).ok())
        .ok_or_else(|| anyhow!("Could not parse time: \"{input}\" (expected HH:MM)"))
}

/// Parse a comma-separated weekday list: names (`mon,wed`) or indices
/// with Sunday as 0 (`1,3`). Duplicates are dropped.
pub fn parse_weekdays(input: &str) -> Result<Vec<Weekday>> {
    let mut days = Vec::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let day = match part.parse::<u8>() {
            Ok(index) => weekday_from_index(index)?,
            Err(_) => part
                .parse::<Weekday>()
                .map_err(|_| anyhow!("Unknown weekday: \"{part}\""))?,
        };
        if !days.contains(&day) {
            days.push(day);
        }
    }

    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_need_full_iso_form() {
        assert_eq!(
            parse_date("2030-03-05").unwrap(),
            NaiveDate::from_ymd_opt(2030, 3, 5).unwrap()
        );
        assert!(parse_date("05/03/2030").is_err());
    }

    #[test]
    fn times_accept_24h_and_am_pm() {
        let half_two = NaiveTime::from_hms_opt(14, 30, 0).unwrap();
        assert_eq!(parse_time("14:30").unwrap(), half_two);
        assert_eq!(parse_time("14:30:00").unwrap(), half_two);
        assert_eq!(parse_time("2:30pm").unwrap(), half_two);
        assert_eq!(parse_time("2:30 PM").unwrap(), half_two);
        assert_eq!(parse_time("9am").unwrap(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(parse_time("noonish").is_err());
    }

    #[test]
    fn weekdays_by_name_or_index() {
        assert_eq!(
            parse_weekdays("mon, Wednesday,fri").unwrap(),
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]
        );
        assert_eq!(
            parse_weekdays("0,6,0").unwrap(),
            vec![Weekday::Sun, Weekday::Sat]
        );
        assert!(parse_weekdays("7").is_err());
        assert!(parse_weekdays("someday").is_err());
        assert!(parse_weekdays("").unwrap().is_empty());
    }
}
