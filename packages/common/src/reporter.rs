use colored::Colorize;
use std::path::Path;
use std::sync::Mutex;

enum Sink {
    Terminal,
    Captured(Mutex<Vec<String>>),
}

/// User-facing progress output for one command invocation.
///
/// Hosts receive a reporter explicitly instead of printing on their own, so
/// tests can capture what a user would see.
pub struct Reporter {
    sink: Sink,
}

impl Reporter {
    /// Colored output to the terminal
    pub fn terminal() -> Self {
        Self {
            sink: Sink::Terminal,
        }
    }

    /// Keeps uncolored lines in memory
    pub fn captured() -> Self {
        Self {
            sink: Sink::Captured(Mutex::new(Vec::new())),
        }
    }

    /// Lines captured so far; empty for terminal reporters
    pub fn lines(&self) -> Vec<String> {
        match &self.sink {
            Sink::Terminal => Vec::new(),
            Sink::Captured(lines) => match lines.lock() {
                Ok(lines) => lines.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            },
        }
    }

    pub fn heading(&self, message: &str) {
        self.emit(message, || message.bright_blue().bold().to_string(), false);
    }

    pub fn info(&self, message: &str) {
        self.emit(message, || message.to_string(), false);
    }

    pub fn success(&self, message: &str) {
        let plain = format!("✓ {}", message);
        self.emit(&plain, || format!("{} {}", "✓".green(), message), false);
    }

    pub fn warn(&self, message: &str) {
        let plain = format!("⚠ {}", message);
        self.emit(&plain, || format!("{} {}", "⚠".yellow(), message.yellow()), true);
    }

    pub fn error(&self, message: &str) {
        let plain = format!("✗ {}", message);
        self.emit(&plain, || format!("{} {}", "✗".red(), message.red()), true);
    }

    /// One compiled file
    pub fn file_written(&self, source: &Path, destination: &Path) {
        let plain = format!("✓ {} → {}", source.display(), destination.display());
        self.emit(
            &plain,
            || {
                format!(
                    "  {} {} → {}",
                    "✓".green(),
                    source.display(),
                    destination.display().to_string().dimmed()
                )
            },
            false,
        );
    }

    pub fn file_failed(&self, source: &Path, reason: &str) {
        let plain = format!("✗ {} - {}", source.display(), reason);
        self.emit(
            &plain,
            || format!("  {} {} - {}", "✗".red(), source.display(), reason.red()),
            true,
        );
    }

    fn emit(&self, plain: &str, styled: impl FnOnce() -> String, to_stderr: bool) {
        match &self.sink {
            Sink::Terminal if to_stderr => eprintln!("{}", styled()),
            Sink::Terminal => println!("{}", styled()),
            Sink::Captured(lines) => match lines.lock() {
                Ok(mut lines) => lines.push(plain.to_string()),
                Err(poisoned) => poisoned.into_inner().push(plain.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_lines_are_plain() {
        let reporter = Reporter::captured();
        reporter.heading("Building");
        reporter.file_written(Path::new("index.html"), Path::new("build/index.html"));
        reporter.file_failed(Path::new("bad.html"), "not found");

        assert_eq!(
            reporter.lines(),
            vec![
                "Building".to_string(),
                "✓ index.html → build/index.html".to_string(),
                "✗ bad.html - not found".to_string(),
            ]
        );
    }

    #[test]
    fn test_terminal_reporter_captures_nothing() {
        let reporter = Reporter::terminal();
        assert!(reporter.lines().is_empty());
    }
}
