//! # PDS time strings
//!
//! TIME columns keep their trimmed text; this module turns that text into a
//! [`hifitime::Epoch`] on demand.
//!
//! Accepted forms (UTC, optional trailing `Z`):
//! * `YYYY-MM-DDThh:mm:ss[.fff]`, `YYYY-MM-DDThh:mm`, `YYYY-MM-DD`
//! * `YYYY-DDDThh:mm:ss[.fff]`, `YYYY-DDDThh:mm`, `YYYY-DDD` (day of year)
//!
//! A space is accepted in place of the `T` separator. Calendar strings go through
//! [`Epoch::from_gregorian_str`], day-of-year strings through [`Epoch::from_format_str`].
use hifitime::Epoch;

use crate::pdstable_errors::PdsTableError;

const DAY_OF_YEAR: &str = "%Y-%jT%H:%M:%S";
const DAY_OF_YEAR_FRACTION: &str = "%Y-%jT%H:%M:%S.%f";

fn invalid(text: &str) -> PdsTableError {
    PdsTableError::InvalidTime(text.to_string())
}

/// Parse a PDS time string as a UTC [`Epoch`].
///
/// Arguments
/// -----------------
/// * `text` – Calendar (`2004-03-17T12:30:00.5`) or day-of-year (`2004-077T12:30:00.5`)
///   time, optionally ending with `Z`.
///
/// Return
/// ----------
/// * The epoch, or [`PdsTableError::InvalidTime`] when the text is not a PDS time.
///
/// See also
/// ------------
/// * [`tai_seconds`] – The same time as TAI seconds.
pub fn parse_pds_time(text: &str) -> Result<Epoch, PdsTableError> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix(['Z', 'z']).unwrap_or(trimmed);
    let (date, clock) = trimmed.split_once(['T', 't', ' ']).unwrap_or((trimmed, ""));

    let mut fields = date.split('-');
    let year = fields.next().unwrap_or_default();
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(text));
    }

    // hifitime wants the seconds.
    let clock = match clock.matches(':').count() {
        _ if clock.is_empty() => "00:00:00".to_string(),
        1 => format!("{clock}:00"),
        _ => clock.to_string(),
    };
    let normalized = format!("{date}T{clock}");

    match fields.count() {
        2 => Epoch::from_gregorian_str(&normalized).map_err(|_| invalid(text)),
        1 => {
            let format = if clock.contains('.') {
                DAY_OF_YEAR_FRACTION
            } else {
                DAY_OF_YEAR
            };
            let epoch = Epoch::from_format_str(&normalized, format).map_err(|_| invalid(text))?;
            // The day number must fall inside the stated year.
            if year.parse::<i32>().ok() != Some(epoch.to_gregorian_utc().0) {
                return Err(invalid(text));
            }
            Ok(epoch)
        }
        _ => Err(invalid(text)),
    }
}

/// TAI seconds (hifitime's J1900 reference) of a PDS time string.
pub fn tai_seconds(text: &str) -> Result<f64, PdsTableError> {
    parse_pds_time(text).map(|epoch| epoch.to_tai_seconds())
}

#[cfg(test)]
mod time_test {
    use super::*;

    #[test]
    fn test_calendar_and_day_of_year_agree() {
        let calendar = parse_pds_time("2004-03-17T12:30:00.500Z").unwrap();
        let ordinal = parse_pds_time("2004-077T12:30:00.500").unwrap();
        assert_eq!(calendar, ordinal);
        assert_eq!(
            calendar,
            Epoch::from_gregorian_utc(2004, 3, 17, 12, 30, 0, 500_000_000)
        );
    }

    #[test]
    fn test_date_only_and_minutes() {
        assert_eq!(
            parse_pds_time("2000-01-01").unwrap(),
            Epoch::from_gregorian_utc_at_midnight(2000, 1, 1)
        );
        assert_eq!(
            parse_pds_time("1999-365 23:59").unwrap(),
            Epoch::from_gregorian_utc(1999, 12, 31, 23, 59, 0, 0)
        );
    }

    #[test]
    fn test_rejects_malformed() {
        for text in [
            "",
            "yesterday",
            "2001-13-01",
            "2001-366",
            "2001-000",
            "2001-01-01T25:00",
            "01-01-01",
        ] {
            assert_eq!(
                parse_pds_time(text),
                Err(PdsTableError::InvalidTime(text.to_string())),
                "{text}"
            );
        }
        assert!(parse_pds_time("2000-366").is_ok());
    }

    #[test]
    fn test_tai_seconds_ordering() {
        let a = tai_seconds("2010-001T00:00:00").unwrap();
        let b = tai_seconds("2010-001T00:00:01").unwrap();
        assert!((b - a - 1.0).abs() < 1e-9);
    }
}
