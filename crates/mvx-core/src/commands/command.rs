use std::fmt;

use crate::composer::Composer;
use crate::errors::{MvxError, Result};
use crate::model::{DetachedItem, ItemHandle};

/// Lifecycle position of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPhase {
    Initial,
    AfterExecute,
    AfterUndo,
}

impl fmt::Display for CommandPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandPhase::Initial => "initial",
            CommandPhase::AfterExecute => "after_execute",
            CommandPhase::AfterUndo => "after_undo",
        };
        f.write_str(name)
    }
}

/// Bookkeeping shared by every command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandState {
    pub description: String,
    pub phase: CommandPhase,
    /// Set when executing changed nothing; obsolete commands are discarded
    pub obsolete: bool,
}

impl CommandState {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            phase: CommandPhase::Initial,
            obsolete: false,
        }
    }

    fn invalid(&self, op: &str) -> MvxError {
        MvxError::InvalidCommandState {
            description: self.description.clone(),
            state: self.phase.to_string(),
            op: op.to_string(),
        }
    }
}

/// Outcome of executing a command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    None,
    Inserted(ItemHandle),
    /// Restore copy of the removed subtree, original identifiers kept
    Removed(DetachedItem),
    DataChanged(bool),
    Moved,
}

impl CommandResult {
    /// # Errors
    ///
    /// Returns `Internal` if the result is of another kind.
    pub fn into_inserted(self) -> Result<ItemHandle> {
        match self {
            CommandResult::Inserted(handle) => Ok(handle),
            other => Err(unexpected("inserted", &other)),
        }
    }

    /// # Errors
    ///
    /// Returns `Internal` if the result is of another kind.
    pub fn into_removed(self) -> Result<DetachedItem> {
        match self {
            CommandResult::Removed(item) => Ok(item),
            other => Err(unexpected("removed", &other)),
        }
    }

    /// Obsolete set-data commands come back as `None`, which means unchanged
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the result is of another kind.
    pub fn into_changed(self) -> Result<bool> {
        match self {
            CommandResult::DataChanged(changed) => Ok(changed),
            CommandResult::None => Ok(false),
            other => Err(unexpected("data_changed", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &CommandResult) -> MvxError {
    MvxError::Internal {
        message: format!("expected {} command result, got {:?}", expected, got),
    }
}

/// Reversible mutation
///
/// Implementors provide `execute_command`/`undo_command`; the provided
/// `execute`/`undo` enforce the lifecycle around them:
///
/// - execute is allowed from `Initial` and `AfterUndo`
/// - undo is allowed from `AfterExecute` and never for obsolete commands
///
/// A failing hook leaves the phase unchanged.
pub trait Command: fmt::Debug {
    fn state(&self) -> &CommandState;

    fn state_mut(&mut self) -> &mut CommandState;

    fn execute_command(&mut self, composer: &mut Composer<'_>) -> Result<CommandResult>;

    fn undo_command(&mut self, composer: &mut Composer<'_>) -> Result<()>;

    fn description(&self) -> &str {
        &self.state().description
    }

    fn is_obsolete(&self) -> bool {
        self.state().obsolete
    }

    fn phase(&self) -> CommandPhase {
        self.state().phase
    }

    /// # Errors
    ///
    /// Returns `InvalidCommandState` if called twice without an undo, or the
    /// hook's error.
    fn execute(&mut self, composer: &mut Composer<'_>) -> Result<CommandResult> {
        if self.phase() == CommandPhase::AfterExecute {
            return Err(self.state().invalid("execute"));
        }
        let result = self.execute_command(composer)?;
        self.state_mut().phase = CommandPhase::AfterExecute;
        Ok(result)
    }

    /// # Errors
    ///
    /// Returns `ObsoleteCommand` for obsolete commands, `InvalidCommandState`
    /// if the command is not executed, or the hook's error.
    fn undo(&mut self, composer: &mut Composer<'_>) -> Result<()> {
        if self.is_obsolete() {
            return Err(MvxError::ObsoleteCommand {
                description: self.description().to_string(),
            });
        }
        if self.phase() != CommandPhase::AfterExecute {
            return Err(self.state().invalid("undo"));
        }
        self.undo_command(composer)?;
        self.state_mut().phase = CommandPhase::AfterUndo;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventNotifier;
    use crate::model::ItemCatalogue;
    use crate::ops::Tree;

    #[derive(Debug)]
    struct Counting {
        state: CommandState,
        runs: usize,
    }

    impl Command for Counting {
        fn state(&self) -> &CommandState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut CommandState {
            &mut self.state
        }
        fn execute_command(&mut self, _composer: &mut Composer<'_>) -> Result<CommandResult> {
            self.runs += 1;
            Ok(CommandResult::None)
        }
        fn undo_command(&mut self, _composer: &mut Composer<'_>) -> Result<()> {
            self.runs -= 1;
            Ok(())
        }
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut tree = Tree::new(ItemCatalogue::default());
        let notifier = EventNotifier::new();
        let mut composer = Composer::new(&mut tree, &notifier);
        let mut cmd = Counting {
            state: CommandState::new("count"),
            runs: 0,
        };

        assert!(matches!(
            cmd.undo(&mut composer),
            Err(MvxError::InvalidCommandState { .. })
        ));
        cmd.execute(&mut composer).unwrap();
        assert_eq!(cmd.phase(), CommandPhase::AfterExecute);
        assert!(matches!(
            cmd.execute(&mut composer),
            Err(MvxError::InvalidCommandState { .. })
        ));
        cmd.undo(&mut composer).unwrap();
        assert_eq!(cmd.phase(), CommandPhase::AfterUndo);
        cmd.execute(&mut composer).unwrap();
        assert_eq!(cmd.runs, 1);
    }

    #[test]
    fn test_obsolete_command_cannot_be_undone() {
        let mut tree = Tree::new(ItemCatalogue::default());
        let notifier = EventNotifier::new();
        let mut composer = Composer::new(&mut tree, &notifier);
        let mut cmd = Counting {
            state: CommandState::new("count"),
            runs: 0,
        };
        cmd.execute(&mut composer).unwrap();
        cmd.state_mut().obsolete = true;

        assert_eq!(
            cmd.undo(&mut composer),
            Err(MvxError::ObsoleteCommand {
                description: "count".into()
            })
        );
    }
}
