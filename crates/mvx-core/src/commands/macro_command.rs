use super::command::{Command, CommandPhase, CommandResult, CommandState};
use crate::composer::Composer;
use crate::errors::Result;

/// Ordered group of commands that undo and redo as one step
///
/// Undo runs the children in reverse order, redo forward. If a child fails
/// part way, the children already processed are rolled back so the group
/// stays all-or-nothing from the stack's point of view.
#[derive(Debug)]
pub struct MacroCommand {
    state: CommandState,
    children: Vec<Box<dyn Command>>,
}

impl MacroCommand {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            state: CommandState::new(description),
            children: Vec::new(),
        }
    }

    /// Add a child that has already been executed
    pub fn push(&mut self, command: Box<dyn Command>) {
        self.children.push(command);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> &[Box<dyn Command>] {
        &self.children
    }

    /// Mark a macro whose children ran while it was open as executed
    pub(crate) fn into_executed(mut self) -> Self {
        self.state.phase = CommandPhase::AfterExecute;
        self
    }
}

impl Command for MacroCommand {
    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }

    fn execute_command(&mut self, composer: &mut Composer<'_>) -> Result<CommandResult> {
        for i in 0..self.children.len() {
            if let Err(e) = self.children[i].execute(composer) {
                for done in self.children[..i].iter_mut().rev() {
                    if let Err(rollback) = done.undo(composer) {
                        tracing::warn!(command = done.description(), error = %rollback, "macro rollback failed");
                    }
                }
                return Err(e);
            }
        }
        Ok(CommandResult::None)
    }

    fn undo_command(&mut self, composer: &mut Composer<'_>) -> Result<()> {
        for i in (0..self.children.len()).rev() {
            if let Err(e) = self.children[i].undo(composer) {
                for done in self.children[i + 1..].iter_mut() {
                    if let Err(rollback) = done.execute(composer) {
                        tracing::warn!(command = done.description(), error = %rollback, "macro rollback failed");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }
}
