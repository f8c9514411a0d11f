//! Output endpoints shipped with this crate.
//!
//! `fern`'s own `Output` enum has `Stdout`/`Stderr`/`File`/`Null` variants;
//! these are the equivalents as standalone [`crate::pipeline::Output`]
//! implementors, since pipelines here hold trait objects rather than a
//! closed enum.
use std::fs::{File as StdFile, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::error::GroveError;
use crate::level::Level;
use crate::pipeline::{ConfigMap, ConfigValue, Output};
use crate::record::Event;

/// The baseline config every shipped output merges its own defaults over
/// (spec.md §6's output function contract: "the config includes at least
/// `level` and `timezone` after defaults are merged"). `level` defaults to
/// `NOTSET` (no output-specific gate beyond the owning pipeline's); the
/// local system timezone is the default `timezone` for outputs that render
/// a timestamp (matching [`crate::record::Event::timestamp`]'s
/// `DateTime<Local>`).
pub fn default_output_config() -> ConfigMap {
    let mut config = ConfigMap::new();
    config.insert("level".to_string(), ConfigValue::Level(Level::NOTSET));
    config.insert("timezone".to_string(), ConfigValue::Str("local".to_string()));
    config
}

/// Writes each presented message, newline-terminated, to stdout or stderr.
pub struct ConsoleOutput {
    stderr: bool,
}

impl ConsoleOutput {
    /// Writes to the process's standard output.
    pub fn stdout() -> Self {
        ConsoleOutput { stderr: false }
    }

    /// Writes to the process's standard error.
    pub fn stderr() -> Self {
        ConsoleOutput { stderr: true }
    }

    /// This output's default configuration (`level`/`timezone`), to be
    /// merged with any user-supplied overrides via [`crate::OutputSpec::new`].
    pub fn default_config(&self) -> ConfigMap {
        default_output_config()
    }
}

impl Output for ConsoleOutput {
    fn call(&self, record: &Event, _config: &ConfigMap) -> Result<(), String> {
        let line = format!("{}\n", record.message);
        let result = if self.stderr { io::stderr().write_all(line.as_bytes()) } else { io::stdout().write_all(line.as_bytes()) };
        result.map_err(|e| e.to_string())
    }
}

/// Appends each presented message, newline-terminated, to a file opened in
/// append mode. Rotation is out of scope — see `DESIGN.md`.
pub struct FileOutput {
    writer: Mutex<BufWriter<StdFile>>,
}

impl FileOutput {
    /// Opens (creating if necessary) `path` in append mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GroveError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(FileOutput { writer: Mutex::new(BufWriter::new(file)) })
    }

    /// This output's default configuration (`level`/`timezone`), to be
    /// merged with any user-supplied overrides via [`crate::OutputSpec::new`].
    pub fn default_config(&self) -> ConfigMap {
        default_output_config()
    }
}

impl Output for FileOutput {
    fn call(&self, record: &Event, _config: &ConfigMap) -> Result<(), String> {
        let mut writer = self.writer.lock().unwrap();
        writeln!(writer, "{}", record.message).map_err(|e| e.to_string())?;
        writer.flush().map_err(|e| e.to_string())
    }
}

/// Discards every record. Useful as a placeholder pipeline output in
/// tests, mirroring `fern`'s `Output::Null`.
pub struct NullOutput;

impl Output for NullOutput {
    fn call(&self, _record: &Event, _config: &ConfigMap) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::level::Level;
    use crate::record::CallSite;
    use std::sync::Arc;

    fn event(msg: &str) -> Event {
        Event::new(
            Arc::from("app"),
            Level::INFO,
            msg.to_string(),
            vec![],
            msg.to_string(),
            None,
            Some(CallSite { filename: "t.rs", lineno: 1 }),
            None,
        )
    }

    #[test]
    fn shipped_outputs_default_to_a_level_and_timezone_key() {
        let console = ConsoleOutput::stdout().default_config();
        assert!(matches!(console.get("level"), Some(ConfigValue::Level(_))));
        assert!(matches!(console.get("timezone"), Some(ConfigValue::Str(_))));

        let dir = tempfile::tempdir().unwrap();
        let file = FileOutput::open(dir.path().join("log.txt")).unwrap().default_config();
        assert!(matches!(file.get("level"), Some(ConfigValue::Level(_))));
        assert!(matches!(file.get("timezone"), Some(ConfigValue::Str(_))));
    }

    #[test]
    fn file_output_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let output = FileOutput::open(&path).unwrap();
        output.call(&event("first"), &ConfigMap::new()).unwrap();
        output.call(&event("second"), &ConfigMap::new()).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn null_output_always_succeeds() {
        let output = NullOutput;
        assert!(output.call(&event("anything"), &ConfigMap::new()).is_ok());
    }
}
