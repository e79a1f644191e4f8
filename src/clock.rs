use chrono::{Datelike, Local, NaiveDateTime, Timelike};

/// Source of the wall-clock time stamped on every endpoint result.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local time of the machine running the client, without timezone normalization.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

impl<C: Clock> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (*self).now()
    }
}

/// Formats `datetime` as `D/M/YYYY @ H:M:S`, no field is zero padded.
pub fn format_call_time<T>(datetime: &T) -> String
where
    T: Datelike + Timelike,
{
    format!(
        "{}/{}/{} @ {}:{}:{}",
        datetime.day(),
        datetime.month(),
        datetime.year(),
        datetime.hour(),
        datetime.minute(),
        datetime.second()
    )
}
