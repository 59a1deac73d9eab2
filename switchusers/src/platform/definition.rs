//! Platform definition for vendor-specific session behavior.

use indexmap::IndexMap;
use regex::bytes::Regex;

use super::privilege_level::PrivilegeLevel;

/// Input requests that interrupt a command before the prompt comes back.
///
/// Matches password sub-prompts, yes/no questions, `[confirm]` and the
/// "press the enter key" / "press any key" banners.
pub const DEFAULT_INPUT_REQUEST: &str = r"(?i)(\[y/n\]|\(y/n\)|\[yes/no\]|\[confirm\]|password:|press the enter key\)|press any key to continue)[:?]*\s*\z";

/// Everything the SSH session needs to know about one CLI dialect.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "cisco_ios", "hp_comware").
    pub name: String,

    /// Privilege levels for this platform, root first.
    pub privilege_levels: IndexMap<String, PrivilegeLevel>,

    /// Privilege level the session must reach before any command is submitted.
    pub default_privilege: String,

    /// Output fragments that mean the device rejected a line.
    pub failed_when_contains: Vec<String>,

    /// Commands to run once the default privilege is reached (paging off).
    pub on_open_commands: Vec<String>,

    /// Pattern for an interactive input request.
    pub input_request: Regex,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,
}

impl PlatformDefinition {
    /// Create a new platform definition with minimal required fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            privilege_levels: IndexMap::new(),
            default_privilege: String::new(),
            failed_when_contains: vec![],
            on_open_commands: vec![],
            input_request: Regex::new(DEFAULT_INPUT_REQUEST).expect("default input request pattern is valid"),
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    /// Add a privilege level.
    pub fn with_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_levels.insert(level.name.clone(), level);
        self
    }

    /// Set the default privilege level.
    pub fn with_default_privilege(mut self, name: impl Into<String>) -> Self {
        self.default_privilege = name.into();
        self
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Find the privilege level a prompt belongs to.
    pub fn privilege_for_prompt(&self, prompt: &str) -> Option<&PrivilegeLevel> {
        self.privilege_levels.values().find(|level| level.matches(prompt))
    }

    /// A regex matching the prompt of any privilege level.
    pub fn prompt_pattern(&self) -> Regex {
        let combined = self
            .privilege_levels
            .values()
            .map(|level| format!("(?:{})", level.pattern.as_str()))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&combined).unwrap_or_else(|_| Regex::new(r"[#>\]]\s*\z").expect("fallback prompt pattern is valid"))
    }

    /// A regex matching either a prompt or an input request.
    pub fn prompt_or_input_pattern(&self) -> Regex {
        let combined = format!(
            "(?:{})|(?:{})",
            self.prompt_pattern().as_str(),
            self.input_request.as_str()
        );
        Regex::new(&combined).unwrap_or_else(|_| self.prompt_pattern())
    }

    /// Levels to climb, in order, to get from `from` up to `to`.
    ///
    /// Returns `None` when `to` is not reachable by escalation from `from`.
    /// An empty path means the session is already there.
    pub fn escalation_path(&self, from: &str, to: &str) -> Option<Vec<&PrivilegeLevel>> {
        let mut path = Vec::new();
        let mut current = self.privilege_levels.get(to)?;
        while current.name != from {
            path.push(current);
            let parent = current.previous_priv.as_deref()?;
            current = self.privilege_levels.get(parent)?;
        }
        path.reverse();
        Some(path)
    }

    /// First failure fragment present in `output`.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .map(String::as_str)
    }
}
