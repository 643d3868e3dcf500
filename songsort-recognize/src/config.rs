//! Effective recognition settings
//!
//! Each value resolves as: command line (or its environment variable) →
//! `[recognize]` section of the TOML file → compiled default.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use songsort_common::config::RecognizeSection;

use crate::error::{RecognizeError, RecognizeResult};

pub const DEFAULT_OUTPUT: &str = "recognized-songs.json";
pub const DEFAULT_DELAY_SECS: f64 = 1.5;
pub const DEFAULT_CONCURRENCY: usize = 1;
pub const DEFAULT_RECURSIVE: bool = true;
pub const DEFAULT_RECOGNIZER_COMMAND: &str = "recognize-one";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Values given on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct RecognizeOverrides {
    pub output: Option<PathBuf>,
    pub limit: Option<usize>,
    pub dump_every: Option<usize>,
    pub delay_secs: Option<f64>,
    pub concurrency: Option<usize>,
    pub non_recursive: bool,
    pub recognizer_command: Option<String>,
    pub recognizer_args: Vec<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizeConfig {
    pub folder: PathBuf,
    pub output: PathBuf,
    pub limit: Option<usize>,
    pub dump_every: Option<usize>,
    pub delay: Duration,
    pub concurrency: usize,
    pub recursive: bool,
    pub recognizer_command: String,
    pub recognizer_args: Vec<String>,
    pub timeout: Duration,
}

impl RecognizeConfig {
    /// Merge command line, config file and defaults
    pub fn resolve(
        folder: PathBuf,
        cli: RecognizeOverrides,
        file: &RecognizeSection,
    ) -> RecognizeResult<Self> {
        let delay_secs = cli.delay_secs.or(file.delay_secs).unwrap_or(DEFAULT_DELAY_SECS);
        let delay = Duration::try_from_secs_f64(delay_secs).map_err(|_| {
            RecognizeError::InvalidConfig(format!(
                "delay must be a non-negative number of seconds, got {}",
                delay_secs
            ))
        })?;

        let concurrency = cli
            .concurrency
            .or(file.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(RecognizeError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let timeout_secs = cli
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(RecognizeError::InvalidConfig(
                "timeout must be at least 1 second".to_string(),
            ));
        }

        let recursive = if cli.non_recursive {
            false
        } else {
            file.recursive.unwrap_or(DEFAULT_RECURSIVE)
        };

        let recognizer_args = if cli.recognizer_args.is_empty() {
            file.recognizer_args.clone().unwrap_or_default()
        } else {
            cli.recognizer_args
        };

        Ok(Self {
            folder,
            output: cli
                .output
                .or_else(|| file.output.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            limit: cli.limit,
            // 0 disables checkpoints
            dump_every: cli.dump_every.or(file.dump_every).filter(|n| *n > 0),
            delay,
            concurrency,
            recursive,
            recognizer_command: cli
                .recognizer_command
                .or_else(|| file.recognizer_command.clone())
                .unwrap_or_else(|| DEFAULT_RECOGNIZER_COMMAND.to_string()),
            recognizer_args,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// One-line rendering of the compiled defaults
pub fn defaults_line() -> String {
    format!(
        "output={}, limit=None, dump_every=None, delay={}, concurrency={}, recursive={}, recognizer={}, timeout={}s",
        DEFAULT_OUTPUT,
        DEFAULT_DELAY_SECS,
        DEFAULT_CONCURRENCY,
        DEFAULT_RECURSIVE,
        DEFAULT_RECOGNIZER_COMMAND,
        DEFAULT_TIMEOUT_SECS
    )
}

impl fmt::Display for RecognizeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "folder={}, output={}, limit={:?}, dump_every={:?}, delay={}, concurrency={}, recursive={}, recognizer={}",
            self.folder.display(),
            self.output.display(),
            self.limit,
            self.dump_every,
            self.delay.as_secs_f64(),
            self.concurrency,
            self.recursive,
            self.recognizer_command,
        )?;
        for arg in &self.recognizer_args {
            write!(f, " {}", arg)?;
        }
        write!(f, ", timeout={}s", self.timeout.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RecognizeConfig::resolve(
            PathBuf::from("/music"),
            RecognizeOverrides::default(),
            &RecognizeSection::default(),
        )
        .unwrap();

        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(config.delay, Duration::from_millis(1500));
        assert_eq!(config.concurrency, 1);
        assert!(config.recursive);
        assert_eq!(config.limit, None);
        assert_eq!(config.dump_every, None);
        assert_eq!(config.recognizer_command, DEFAULT_RECOGNIZER_COMMAND);
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_cli_beats_file_beats_default() {
        let file = RecognizeSection {
            delay_secs: Some(0.5),
            concurrency: Some(4),
            recursive: Some(true),
            recognizer_args: Some(vec!["--from-file".to_string()]),
            ..Default::default()
        };
        let cli = RecognizeOverrides {
            concurrency: Some(2),
            non_recursive: true,
            recognizer_args: vec!["--from-cli".to_string()],
            ..Default::default()
        };

        let config = RecognizeConfig::resolve(PathBuf::from("/music"), cli, &file).unwrap();
        assert_eq!(config.delay, Duration::from_millis(500));
        assert_eq!(config.concurrency, 2);
        assert!(!config.recursive);
        assert_eq!(config.recognizer_args, vec!["--from-cli".to_string()]);
    }

    #[test]
    fn test_zero_dump_every_disables_checkpoints() {
        let cli = RecognizeOverrides {
            dump_every: Some(0),
            ..Default::default()
        };
        let config =
            RecognizeConfig::resolve(PathBuf::from("/m"), cli, &RecognizeSection::default())
                .unwrap();
        assert_eq!(config.dump_every, None);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let negative = RecognizeOverrides {
            delay_secs: Some(-1.0),
            ..Default::default()
        };
        assert!(
            RecognizeConfig::resolve(PathBuf::from("/m"), negative, &Default::default()).is_err()
        );

        for delay in [1e20, f64::INFINITY, f64::NAN] {
            let huge = RecognizeOverrides {
                delay_secs: Some(delay),
                ..Default::default()
            };
            assert!(matches!(
                RecognizeConfig::resolve(PathBuf::from("/m"), huge, &Default::default()),
                Err(RecognizeError::InvalidConfig(_))
            ));
        }

        let zero = RecognizeOverrides {
            concurrency: Some(0),
            ..Default::default()
        };
        assert!(RecognizeConfig::resolve(PathBuf::from("/m"), zero, &Default::default()).is_err());
    }
}
