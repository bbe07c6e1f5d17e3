//! Privilege level tracking and escalation planning.

use indexmap::IndexMap;

use crate::platform::PrivilegeLevel;

/// Tracks the current privilege level of a session.
///
/// Levels form a tree through their `parent` links. Show commands only
/// ever need to move up that tree (e.g. `exec` to `privilege_exec`), so
/// the tracker plans escalation steps and never de-escalates.
#[derive(Debug)]
pub struct PrivilegeManager {
    /// All defined privilege levels.
    levels: IndexMap<String, PrivilegeLevel>,

    /// Current privilege level name.
    current: Option<String>,
}

impl PrivilegeManager {
    pub fn new(levels: IndexMap<String, PrivilegeLevel>) -> Self {
        Self {
            levels,
            current: None,
        }
    }

    /// Determine the privilege level a prompt belongs to.
    pub fn determine_from_prompt(&self, prompt: &str) -> Option<&PrivilegeLevel> {
        self.levels.values().find(|level| level.matches(prompt))
    }

    /// Update the current level from a prompt. Returns the level name.
    pub fn observe(&mut self, prompt: &str) -> Option<&str> {
        let name = self.determine_from_prompt(prompt)?.name.clone();
        self.current = Some(name);
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&PrivilegeLevel> {
        self.current.as_ref().and_then(|name| self.levels.get(name))
    }

    /// Levels to enter, in order, to get from `from` up to `to`.
    ///
    /// Empty when already there; `None` when `to` is not reachable by
    /// escalation from `from`.
    pub fn escalation_path(&self, from: &str, to: &str) -> Option<Vec<&PrivilegeLevel>> {
        let mut steps = Vec::new();
        let mut node = self.levels.get(to)?;

        while node.name != from {
            steps.push(node);
            let parent = node.parent.as_deref()?;
            node = self.levels.get(parent)?;
        }

        steps.reverse();
        Some(steps)
    }
}
