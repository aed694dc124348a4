//! Buildpack-style user-facing output
//!
//! Lines are indented by level the way the lifecycle output of other
//! buildpacks is: titles flush left, processes by two spaces, subprocesses by
//! four and actions by six. Diagnostics go through `tracing` instead.

use std::io::Write;
use std::sync::{Arc, Mutex};

/// Shareable line logger writing to any sink
#[derive(Clone)]
pub struct BuildLogger {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl std::fmt::Debug for BuildLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildLogger").finish_non_exhaustive()
    }
}

impl BuildLogger {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn title(&self, message: impl AsRef<str>) {
        self.line(0, message.as_ref());
    }

    pub fn process(&self, message: impl AsRef<str>) {
        self.line(2, message.as_ref());
    }

    pub fn subprocess(&self, message: impl AsRef<str>) {
        self.line(4, message.as_ref());
    }

    pub fn action(&self, message: impl AsRef<str>) {
        self.line(6, message.as_ref());
    }

    pub fn break_line(&self) {
        self.line(0, "");
    }

    fn line(&self, indent: usize, message: &str) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };

        // Output failures must not abort a build.
        for line in message.split('\n') {
            let _ = if line.is_empty() {
                writeln!(out)
            } else {
                writeln!(out, "{:indent$}{}", "", line, indent = indent)
            };
        }
        let _ = out.flush();
    }
}

/// In-memory sink for capturing log output
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_indented() {
        let buffer = SharedBuffer::new();
        let logger = BuildLogger::new(buffer.clone());

        logger.title("Dotnet Publish 1.0.0");
        logger.process("Executing build process");
        logger.subprocess("Running 'dotnet publish'");
        logger.action("Completed in 1s");
        logger.break_line();

        assert_eq!(
            buffer.contents(),
            "Dotnet Publish 1.0.0\n  Executing build process\n    Running 'dotnet publish'\n      Completed in 1s\n\n"
        );
    }

    #[test]
    fn test_multiline_messages_keep_indent() {
        let buffer = SharedBuffer::new();
        let logger = BuildLogger::new(buffer.clone());

        logger.subprocess("first\nsecond");

        assert_eq!(buffer.contents(), "    first\n    second\n");
    }

    #[test]
    fn test_clones_share_the_sink() {
        let buffer = SharedBuffer::new();
        let logger = BuildLogger::new(buffer.clone());
        let clone = logger.clone();

        logger.process("one");
        clone.process("two");

        assert_eq!(buffer.contents(), "  one\n  two\n");
    }
}
