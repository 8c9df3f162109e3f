//! Fluent construction of [`ProcessCommand`]s

use std::path::Path;
use std::time::Duration;

use crate::subprocess::ProcessCommand;

pub struct ProcessCommandBuilder {
    command: ProcessCommand,
}

impl ProcessCommandBuilder {
    pub fn new(program: &str) -> Self {
        Self {
            command: ProcessCommand {
                program: program.to_string(),
                args: Vec::new(),
                working_dir: None,
                timeout: None,
                suppress_stderr: false,
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.command.args.push(arg.to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.command
            .args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Add a `docker run -v host:guest[:ro]` mount
    pub fn volume(self, host: &Path, guest: &Path, read_only: bool) -> Self {
        let mut spec = format!("{}:{}", host.display(), guest.display());
        if read_only {
            spec.push_str(":ro");
        }
        self.arg("-v").arg(&spec)
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.command.working_dir = Some(dir.to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.command.timeout = Some(timeout);
        self
    }

    /// Discard the child's stderr instead of relaying it
    pub fn suppress_stderr(mut self) -> Self {
        self.command.suppress_stderr = true;
        self
    }

    pub fn build(self) -> ProcessCommand {
        self.command
    }
}
