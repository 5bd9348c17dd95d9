use std::path::{Path, PathBuf};

use intemp::config::RunSettings;
use intemp::exec::{CommandSpec, StdioBindings};
use intemp::types::{ConflictAction, ErrorPolicy, OverwritePolicy, PreservePolicy};
use intemp::workspace::WorkspaceSpec;

/// Builder for `RunSettings` to simplify test setup.
pub struct SettingsBuilder {
    settings: RunSettings,
}

impl SettingsBuilder {
    /// Settings running `argv`, publishing into `dest`, with workspaces
    /// generated under `temp_parent`.
    pub fn new(argv: &[&str], temp_parent: &Path, dest: &Path) -> Self {
        let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
        let command = CommandSpec::from_argv(&argv).expect("test command must not be empty");
        let mut settings = RunSettings::new(command, dest.to_path_buf());
        settings.workspace = WorkspaceSpec::Under(temp_parent.to_path_buf());
        Self { settings }
    }

    pub fn fixed_workspace(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.workspace = WorkspaceSpec::Fixed(path.into());
        self
    }

    pub fn preserve(mut self, policy: PreservePolicy) -> Self {
        self.settings.preserve = policy;
        self
    }

    pub fn overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.settings.overwrite = policy;
        self
    }

    pub fn on_conflict(mut self, action: ConflictAction) -> Self {
        self.settings.on_conflict = action;
        self
    }

    pub fn on_error(mut self, policy: ErrorPolicy) -> Self {
        self.settings.on_error = policy;
        self
    }

    pub fn force_copy(mut self, val: bool) -> Self {
        self.settings.force_copy = val;
        self
    }

    pub fn stdio(mut self, stdio: StdioBindings) -> Self {
        self.settings.command = self.settings.command.with_stdio(stdio);
        self
    }

    pub fn build(self) -> RunSettings {
        self.settings
    }
}
