//! Recognition services
//!
//! - `file_scanner`: folder scan with the audio extension allow-list
//! - `rate_limiter`: global pacing of recognizer calls
//! - `recognizer`: recognizer capability and outcome classification
//! - `command_recognizer`: subprocess-backed recognizer
//! - `track_response`: response document extraction

pub mod command_recognizer;
pub mod file_scanner;
pub mod rate_limiter;
pub mod recognizer;
pub mod track_response;

pub use command_recognizer::CommandRecognizer;
pub use file_scanner::{FileScanner, ScanError};
pub use rate_limiter::RateLimiter;
pub use recognizer::{classify, Recognition, Recognizer, RecognizerError};
