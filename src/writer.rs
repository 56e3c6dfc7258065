//! Serializes entries into the switch CLI command format, one line per entry:
//!
//! ```text
//! table_add <table> <action> <match...> => <param...> [<priority>]
//! ```
//!
//! Range keys are rendered `lo->hi`, exact keys as plain integers.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::emit::{Entry, MatchField};
use crate::error::{CompileError, Result};

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchField::Range { range, .. } => write!(f, "{}", range),
            MatchField::Exact(code) => write!(f, "{}", code),
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table_add {} {}", self.table, self.action)?;
        for field in &self.matches {
            write!(f, " {}", field)?;
        }
        write!(f, " =>")?;
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        if let Some(priority) = self.priority {
            write!(f, " {}", priority)?;
        }
        Ok(())
    }
}

/// Append-only writer: entries go out in the order they are given.
pub struct RuleWriter<W: Write> {
    out: W,
    written: usize,
}

impl<W: Write> RuleWriter<W> {
    pub fn new(out: W) -> Self {
        RuleWriter { out, written: 0 }
    }

    pub fn write_entry(&mut self, entry: &Entry) -> std::io::Result<()> {
        writeln!(self.out, "{}", entry)?;
        self.written += 1;
        Ok(())
    }

    pub fn write_all(&mut self, entries: &[Entry]) -> std::io::Result<()> {
        entries.iter().try_for_each(|entry| self.write_entry(entry))
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes and returns the underlying sink.
    pub fn finish(mut self) -> std::io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Writes `entries` to `path`, creating or truncating it.
///
/// A failure part-way leaves a partial file behind; the error names the path.
pub fn write_rules_file<P: AsRef<Path>>(path: P, entries: &[Entry]) -> Result<usize> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| CompileError::io(path, e))?;
    let mut writer = RuleWriter::new(BufWriter::new(file));
    writer.write_all(entries).map_err(|e| CompileError::io(path, e))?;
    let written = writer.written();
    writer.finish().map_err(|e| CompileError::io(path, e))?;
    log::info!("Wrote {} entries to {:?}", written, path);
    Ok(written)
}

/// Renders `entries` into a string, exactly as `write_rules_file` would.
pub fn render_rules(entries: &[Entry]) -> String {
    entries.iter().map(|entry| format!("{}\n", entry)).collect()
}
