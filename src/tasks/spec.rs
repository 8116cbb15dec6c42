//! Task descriptors: plain, freely-copyable data bound from config.
//!
//! A [`TaskSpec`] describes *what* to run and *when*; it owns no runtime
//! state. [`TaskSpec::compile`] validates it and produces the five-field
//! cron expression the trigger registers under. Runtime state lives in
//! [`Task`](crate::Task), which is built from a compiled spec.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::trigger::schedule;

/// Five cron fields, each defaulting to `"*"` when left empty.
///
/// Field order in the combined expression is
/// `minute hour day-of-month month day-of-week`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct ScheduleSpec {
    pub minute: String,
    pub hour: String,
    pub month_day: String,
    pub month: String,
    pub week_day: String,
}

impl ScheduleSpec {
    /// Joins the five fields into a standard cron expression,
    /// substituting `"*"` for empty fields.
    pub fn expression(&self) -> String {
        [
            field(&self.minute),
            field(&self.hour),
            field(&self.month_day),
            field(&self.month),
            field(&self.week_day),
        ]
        .join(" ")
    }
}

fn field(value: &str) -> &str {
    if value.is_empty() {
        "*"
    } else {
        value
    }
}

/// Descriptor for one schedulable job.
///
/// Binds from a YAML jobs file in snake_case and serializes (inside
/// [`TaskSnapshot`](crate::TaskSnapshot)) in camelCase.
///
/// # Example
/// ```
/// use cronvisor::TaskSpec;
///
/// let mut spec = TaskSpec::new("nightly-backup", "/usr/local/bin/backup");
/// spec.cron.minute = "0".into();
/// spec.cron.hour = "2".into();
/// assert_eq!(spec.compile().unwrap(), "0 2 * * *");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct TaskSpec {
    /// Job name; required, must be non-empty.
    pub name: String,
    /// Executable to launch.
    pub path: PathBuf,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Working directory for the child; inherits the host's when `None`.
    pub work_dir: Option<PathBuf>,
    /// Schedule fields.
    pub cron: ScheduleSpec,
    /// Fire one run as soon as the manager starts, ahead of the schedule.
    pub start_immediately: bool,
    /// Additional attempts beyond the first when a run fails.
    pub max_retries: u32,
    /// Optional pause between retry attempts. No delay when unset.
    pub retry_delay_secs: Option<u64>,
}

impl TaskSpec {
    /// Creates a descriptor with the given name and executable path;
    /// everything else starts at its default.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Validates the descriptor and builds its cron expression.
    ///
    /// Fails with [`Error::EmptyName`] for a nameless job and
    /// [`Error::InvalidSchedule`] when the combined expression does not
    /// parse.
    pub fn compile(&self) -> Result<String, Error> {
        if self.name.is_empty() {
            return Err(Error::EmptyName);
        }
        let expr = self.cron.expression();
        schedule::parse_standard(&expr)?;
        Ok(expr)
    }

    /// Inter-retry pause as a [`Duration`], when configured.
    pub fn retry_delay(&self) -> Option<Duration> {
        self.retry_delay_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_become_wildcards() {
        let spec = ScheduleSpec::default();
        assert_eq!(spec.expression(), "* * * * *");
    }

    #[test]
    fn test_expression_preserves_field_order() {
        let spec = ScheduleSpec {
            minute: "*/5".into(),
            hour: "8-18".into(),
            month_day: String::new(),
            month: String::new(),
            week_day: "1-5".into(),
        };
        assert_eq!(spec.expression(), "*/5 8-18 * * 1-5");
    }

    #[test]
    fn test_compile_rejects_empty_name() {
        let spec = TaskSpec::new("", "/bin/true");
        assert!(matches!(spec.compile(), Err(Error::EmptyName)));
    }

    #[test]
    fn test_compile_rejects_bad_expression() {
        let mut spec = TaskSpec::new("bad", "/bin/true");
        spec.cron.minute = "61".into();
        assert!(matches!(spec.compile(), Err(Error::InvalidSchedule { .. })));
    }

    #[test]
    fn test_compile_defaults_to_every_minute() {
        let spec = TaskSpec::new("t1", "/bin/false");
        assert_eq!(spec.compile().unwrap(), "* * * * *");
    }

    #[test]
    fn test_retry_delay_maps_seconds() {
        let mut spec = TaskSpec::new("d", "/bin/true");
        assert_eq!(spec.retry_delay(), None);
        spec.retry_delay_secs = Some(3);
        assert_eq!(spec.retry_delay(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_binds_snake_case_yaml() {
        let yaml = r#"
name: reindex
path: /usr/bin/reindex
args: ["--all"]
work_dir: /var/lib/search
cron:
  minute: "30"
  hour: "4"
  week_day: "6"
start_immediately: true
max_retries: 2
retry_delay_secs: 10
"#;
        let spec: TaskSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.name, "reindex");
        assert_eq!(spec.args, vec!["--all".to_string()]);
        assert_eq!(spec.work_dir.as_deref(), Some(std::path::Path::new("/var/lib/search")));
        assert_eq!(spec.compile().unwrap(), "30 4 * * 6");
        assert!(spec.start_immediately);
        assert_eq!(spec.max_retries, 2);
        assert_eq!(spec.retry_delay_secs, Some(10));
    }
}
