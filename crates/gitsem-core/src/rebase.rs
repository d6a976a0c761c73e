//! Interactive rebase planning and execution.
//!
//! A [`RebasePlan`] is seeded with one `pick` step per commit in
//! `(base, HEAD]`, oldest first. Steps can be swapped with their adjacent
//! neighbour and their action reassigned; [`RebasePlan::execute`] then hands
//! the todo to the backend, which replaces the rebase's own todo verbatim.
//!
//! A failed execution (usually a conflict) is reported as-is. Continuing,
//! skipping, or aborting is left to the caller.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::errors::GitsemError;

/// What the rebase does with a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebaseAction {
    #[default]
    Pick,
    Squash,
    Fixup,
    Edit,
    Drop,
    Reword,
}

impl RebaseAction {
    pub const ALL: [RebaseAction; 6] = [
        Self::Pick,
        Self::Squash,
        Self::Fixup,
        Self::Edit,
        Self::Drop,
        Self::Reword,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pick => "pick",
            Self::Squash => "squash",
            Self::Fixup => "fixup",
            Self::Edit => "edit",
            Self::Drop => "drop",
            Self::Reword => "reword",
        }
    }

    /// The next action in [`RebaseAction::ALL`], wrapping around.
    pub fn cycle(&self) -> Self {
        let idx = Self::ALL.iter().position(|a| a == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for RebaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RebaseAction {
    type Err = GitsemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pick" | "p" => Ok(Self::Pick),
            "squash" | "s" => Ok(Self::Squash),
            "fixup" | "f" => Ok(Self::Fixup),
            "edit" | "e" => Ok(Self::Edit),
            "drop" | "d" => Ok(Self::Drop),
            "reword" | "r" => Ok(Self::Reword),
            other => Err(GitsemError::InvalidArgument(format!(
                "Unknown rebase action `{}`",
                other
            ))),
        }
    }
}

/// One line of the rebase todo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebaseStep {
    pub action: RebaseAction,
    pub hash: String,
    /// Display message (the commit subject).
    pub message: String,
}

impl RebaseStep {
    pub fn pick(hash: &str, message: &str) -> Self {
        Self {
            action: RebaseAction::Pick,
            hash: hash.to_string(),
            message: message.to_string(),
        }
    }

    /// `action hash message`
    pub fn todo_line(&self) -> String {
        format!("{} {} {}", self.action, self.hash, self.message)
    }
}

/// Serialize steps as a rebase todo, one `action hash message` line per step.
pub fn render_todo(steps: &[RebaseStep]) -> String {
    steps.iter().map(|s| format!("{}\n", s.todo_line())).collect()
}

/// An ordered, editable list of rebase steps onto a base reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebasePlan {
    pub base: String,
    pub steps: Vec<RebaseStep>,
}

impl RebasePlan {
    /// Seed a plan with one `pick` per commit in `(base, HEAD]`, oldest first.
    pub fn build<B: Backend + ?Sized>(backend: &B, base: &str) -> Result<Self, GitsemError> {
        let commits = backend.commits_in_range(base, "HEAD")?;
        let steps = commits
            .iter()
            .map(|c| RebaseStep::pick(&c.hash, &c.subject))
            .collect::<Vec<_>>();

        tracing::debug!(base, steps = steps.len(), "Built rebase plan");
        Ok(Self {
            base: base.to_string(),
            steps,
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn check(&self, index: usize) -> Result<(), GitsemError> {
        if index >= self.steps.len() {
            return Err(GitsemError::InvalidStepIndex {
                index,
                len: self.steps.len(),
            });
        }
        Ok(())
    }

    /// Swap the steps at `index` and `index + 1`.
    pub fn swap_with_next(&mut self, index: usize) -> Result<(), GitsemError> {
        self.check(index)?;
        self.check(index + 1)?;
        self.steps.swap(index, index + 1);
        Ok(())
    }

    /// Move the step at `index` one position earlier.
    pub fn move_up(&mut self, index: usize) -> Result<(), GitsemError> {
        if index == 0 {
            return Err(GitsemError::InvalidStepIndex {
                index,
                len: self.steps.len(),
            });
        }
        self.swap_with_next(index - 1)
    }

    /// Move the step at `index` one position later.
    pub fn move_down(&mut self, index: usize) -> Result<(), GitsemError> {
        self.swap_with_next(index)
    }

    pub fn set_action(&mut self, index: usize, action: RebaseAction) -> Result<(), GitsemError> {
        self.check(index)?;
        self.steps[index].action = action;
        Ok(())
    }

    pub fn todo(&self) -> String {
        render_todo(&self.steps)
    }

    /// Run the plan. A non-zero rebase exit is returned as [`GitsemError::RebaseFailed`].
    pub fn execute<B: Backend + ?Sized>(&self, backend: &B) -> Result<(), GitsemError> {
        if self.steps.is_empty() {
            return Err(GitsemError::InvalidArgument(format!(
                "Nothing to rebase onto `{}`",
                self.base
            )));
        }
        tracing::info!(base = %self.base, steps = self.steps.len(), "Executing rebase plan");
        backend.run_interactive_rebase(&self.base, &self.steps)
    }
}
