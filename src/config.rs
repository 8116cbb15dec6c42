//! Jobs-file loading: a YAML document with a top-level `jobs:` list of
//! task descriptors in snake_case.
//!
//! ```yaml
//! jobs:
//!   - name: backup
//!     path: /usr/local/bin/backup
//!     args: ["--full"]
//!     cron:
//!       minute: "0"
//!       hour: "2"
//!     max_retries: 2
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Error;
use crate::tasks::TaskSpec;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JobsFile {
    jobs: Vec<TaskSpec>,
}

/// Reads `path` and returns its descriptors in file order.
pub fn read_specs(path: &Path) -> Result<Vec<TaskSpec>, Error> {
    let raw = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let file: JobsFile = serde_yaml::from_str(&raw).map_err(|source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.jobs)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_reads_jobs_in_file_order() {
        let file = write_config(
            r#"
jobs:
  - name: first
    path: /bin/true
  - name: second
    path: /bin/false
    max_retries: 1
"#,
        );
        let specs = read_specs(file.path()).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "first");
        assert_eq!(specs[1].name, "second");
        assert_eq!(specs[1].max_retries, 1);
    }

    #[test]
    fn test_missing_jobs_key_is_empty() {
        let file = write_config("unrelated: true\n");
        assert!(read_specs(file.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = read_specs(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn test_malformed_yaml_is_a_parse_error() {
        let file = write_config("jobs: [not, closed\n");
        let err = read_specs(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }
}
