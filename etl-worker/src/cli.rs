use chrono::{Days, NaiveDateTime, NaiveTime};
use clap::Parser;
use etl::bail;
use etl::error::{ErrorKind, EtlResult};
use etl::types::{TimeWindow, WINDOW_TIME_FORMAT};

/// Command line arguments of the worker.
#[derive(Debug, Parser)]
#[command(
    name = "etl-worker",
    about = "Copies the event records of one time window from the source to the target database"
)]
pub struct Args {
    /// Inclusive start of the window, local time (format: yyyy-mm-dd hh:mm:ss).
    #[arg(long = "start-at", alias = "start_at", value_name = "DATETIME")]
    pub start_at: Option<String>,

    /// Exclusive end of the window, local time (format: yyyy-mm-dd hh:mm:ss).
    #[arg(long = "end-at", alias = "end_at", value_name = "DATETIME")]
    pub end_at: Option<String>,
}

impl Args {
    pub fn time_window(&self, now: NaiveDateTime) -> EtlResult<TimeWindow> {
        parse_time_window(self.start_at.as_deref(), self.end_at.as_deref(), now)
    }
}

/// Builds the extraction window from the optional bounds.
///
/// Without bounds the window covers the whole day before `now`. Bounds must be given together
/// and the end must not precede the start.
pub fn parse_time_window(
    start_at: Option<&str>,
    end_at: Option<&str>,
    now: NaiveDateTime,
) -> EtlResult<TimeWindow> {
    match (start_at, end_at) {
        (None, None) => {
            let today = now.date().and_time(NaiveTime::MIN);
            let Some(yesterday) = today.checked_sub_days(Days::new(1)) else {
                bail!(
                    ErrorKind::ConfigError,
                    "Cannot compute the default time window",
                    format!("no day before {today}")
                );
            };

            TimeWindow::new(yesterday, today)
        }
        (Some(start_at), Some(end_at)) => TimeWindow::parse(start_at, end_at),
        _ => bail!(
            ErrorKind::ConfigError,
            "Invalid time window arguments",
            format!("--start-at and --end-at must be given together, expected format {WINDOW_TIME_FORMAT}")
        ),
    }
}
