//! Subprocess recognizer
//!
//! Runs `<program> [args...] <file>` once per file. The program prints a
//! Shazam-shaped JSON document on stdout; every stderr line is forwarded to the
//! log tagged with the file so low-level decoder and network messages can be
//! matched to entries in the error log.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use super::recognizer::{Recognition, Recognizer, RecognizerError};
use super::track_response::parse_response;

/// Recognizer backed by an external program
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRecognizer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

#[async_trait]
impl Recognizer for CommandRecognizer {
    async fn recognize(&self, path: &Path) -> Result<Recognition, RecognizerError> {
        debug!(program = %self.program, file = %path.display(), "Running recognizer");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecognizerError::Spawn(format!("{}: {}", self.program, e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| RecognizerError::Io("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RecognizerError::Io("stderr not captured".to_string()))?;

        let forwarder = tokio::spawn(forward_stderr(stderr, path.display().to_string()));

        let run = async {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((buf, status))
        };
        let result = tokio::time::timeout(self.timeout, run).await;

        let (stdout_bytes, status) = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                forwarder.abort();
                return Err(RecognizerError::Io(e.to_string()));
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(
                        file = %path.display(),
                        error = %e,
                        "Failed to kill timed out recognizer"
                    );
                }
                forwarder.abort();
                return Err(RecognizerError::Timeout(self.timeout.as_secs()));
            }
        };

        // Drain stderr so every line is logged before the outcome
        let _ = forwarder.await;

        // Unparsable output wins over the exit code
        let recognition =
            parse_response(&stdout_bytes).map_err(|e| RecognizerError::Parse(e.to_string()))?;

        if !status.success() {
            return Err(RecognizerError::ChildExit(status.code().unwrap_or(-1)));
        }

        Ok(recognition)
    }
}

async fn forward_stderr<R>(stderr: R, file: String)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => warn!(file = %file, "{}", line),
            Ok(None) => break,
            Err(e) => {
                debug!(file = %file, error = %e, "Stopped reading recognizer stderr");
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn script(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("recognizer.sh");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn recognizer(path: &Path, timeout_secs: u64) -> CommandRecognizer {
        CommandRecognizer::new(
            path.display().to_string(),
            Vec::new(),
            Duration::from_secs(timeout_secs),
        )
    }

    #[tokio::test]
    async fn test_match_from_stdout() {
        let dir = TempDir::new().unwrap();
        let exe = script(
            &dir,
            r#"echo "decoding $1" >&2
echo '{"track": {"subtitle": "Queen", "title": "Test"}}'"#,
        );
        let result = recognizer(&exe, 10).recognize(Path::new("/m/a.mp3")).await.unwrap();
        let Recognition::Matched(meta) = result else {
            panic!("expected match");
        };
        assert_eq!(meta.author.as_deref(), Some("Queen"));
    }

    #[tokio::test]
    async fn test_file_path_is_last_argument() {
        let dir = TempDir::new().unwrap();
        let exe = script(
            &dir,
            r#"printf '{"track": {"subtitle": "%s", "title": "%s"}}' "$1" "$2""#,
        );
        let rec = CommandRecognizer::new(
            exe.display().to_string(),
            vec!["--json".to_string()],
            Duration::from_secs(10),
        );
        let Recognition::Matched(meta) = rec.recognize(Path::new("/m/x.mp3")).await.unwrap() else {
            panic!("expected match");
        };
        assert_eq!(meta.author.as_deref(), Some("--json"));
        assert_eq!(meta.song.as_deref(), Some("/m/x.mp3"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_child_exit() {
        let dir = TempDir::new().unwrap();
        let exe = script(&dir, "echo 'network down' >&2\nexit 3");
        let err = recognizer(&exe, 10).recognize(Path::new("/m/a.mp3")).await.unwrap_err();
        assert_eq!(err.to_string(), "ChildExit 3");
    }

    #[tokio::test]
    async fn test_garbage_stdout_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let exe = script(&dir, "echo 'not json'");
        let err = recognizer(&exe, 10).recognize(Path::new("/m/a.mp3")).await.unwrap_err();
        assert!(err.to_string().starts_with("ParseError: "));
    }

    #[tokio::test]
    async fn test_empty_output_is_no_match() {
        let dir = TempDir::new().unwrap();
        let exe = script(&dir, "exit 0");
        let result = recognizer(&exe, 10).recognize(Path::new("/m/a.mp3")).await.unwrap();
        assert_eq!(result, Recognition::NoMatch(None));
    }

    #[tokio::test]
    async fn test_timeout() {
        let dir = TempDir::new().unwrap();
        let exe = script(&dir, "exec sleep 5");
        let err = recognizer(&exe, 1).recognize(Path::new("/m/a.mp3")).await.unwrap_err();
        assert_eq!(err.to_string(), "Timeout after 1s");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let rec = recognizer(Path::new("/nonexistent/recognizer"), 10);
        let err = rec.recognize(Path::new("/m/a.mp3")).await.unwrap_err();
        assert!(matches!(err, RecognizerError::Spawn(_)));
    }
}
