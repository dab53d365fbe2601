use super::command::{Command, CommandResult};
use super::macro_command::MacroCommand;
use crate::composer::Composer;
use crate::errors::{MvxError, Result};
use crate::events::EventNotifier;
use crate::ops::Tree;

/// Undo/redo history
///
/// `commands[..index]` can be undone, `commands[index..]` redone. Executing a
/// new command drops the redo branch. While a macro is open, executed
/// commands collect in the macro and undo/redo do nothing.
#[derive(Debug, Default)]
pub struct CommandStack {
    commands: Vec<Box<dyn Command>>,
    index: usize,
    open_macros: Vec<MacroCommand>,
    /// 0 means unlimited
    undo_limit: usize,
}

impl CommandStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(undo_limit: usize) -> Self {
        Self {
            undo_limit,
            ..Self::default()
        }
    }

    /// Execute a command and record it
    ///
    /// A command that fails is not retained. A command that reports itself
    /// obsolete after executing is dropped silently.
    ///
    /// # Errors
    ///
    /// Returns whatever the command's execution returns.
    pub fn execute(
        &mut self,
        mut command: Box<dyn Command>,
        tree: &mut Tree,
        notifier: &EventNotifier,
    ) -> Result<CommandResult> {
        let result = command.execute(&mut Composer::for_command(tree, notifier))?;
        if command.is_obsolete() {
            tracing::debug!(command = command.description(), "obsolete command discarded");
            return Ok(result);
        }
        self.push(command);
        Ok(result)
    }

    fn push(&mut self, command: Box<dyn Command>) {
        if let Some(open) = self.open_macros.last_mut() {
            open.push(command);
            return;
        }
        tracing::debug!(command = command.description(), index = self.index, "command recorded");
        self.commands.truncate(self.index);
        self.commands.push(command);
        self.index += 1;
        self.enforce_limit();
    }

    /// Undo one step; a no-op when nothing can be undone
    ///
    /// # Errors
    ///
    /// Returns the command's undo error, typically `PathNotResolved`. The
    /// cursor does not move on failure.
    pub fn undo(&mut self, tree: &mut Tree, notifier: &EventNotifier) -> Result<()> {
        if !self.can_undo() {
            return Ok(());
        }
        let command = &mut self.commands[self.index - 1];
        command.undo(&mut Composer::for_command(tree, notifier))?;
        self.index -= 1;
        Ok(())
    }

    /// Redo one step; a no-op when nothing can be redone
    ///
    /// # Errors
    ///
    /// Returns the command's execute error. The cursor does not move on failure.
    pub fn redo(&mut self, tree: &mut Tree, notifier: &EventNotifier) -> Result<()> {
        if !self.can_redo() {
            return Ok(());
        }
        let command = &mut self.commands[self.index];
        command.execute(&mut Composer::for_command(tree, notifier))?;
        self.index += 1;
        Ok(())
    }

    /// Open a macro; macros nest
    pub fn begin_macro(&mut self, description: impl Into<String>) {
        let description = description.into();
        tracing::debug!(description = %description, depth = self.open_macros.len() + 1, "begin macro");
        self.open_macros.push(MacroCommand::new(description));
    }

    /// Close the innermost macro and record it; empty macros are dropped
    ///
    /// # Errors
    ///
    /// Returns `NoOpenMacro` if no macro is open.
    pub fn end_macro(&mut self) -> Result<()> {
        let closed = self.open_macros.pop().ok_or(MvxError::NoOpenMacro)?;
        if closed.is_empty() {
            tracing::debug!(description = closed.description(), "empty macro dropped");
            return Ok(());
        }
        self.push(Box::new(closed.into_executed()));
        Ok(())
    }

    pub fn is_macro_open(&self) -> bool {
        !self.open_macros.is_empty()
    }

    /// Cap the history; only entries before the cursor are evicted
    pub fn set_undo_limit(&mut self, limit: usize) {
        self.undo_limit = limit;
        self.enforce_limit();
    }

    pub fn undo_limit(&self) -> usize {
        self.undo_limit
    }

    fn enforce_limit(&mut self) {
        if self.undo_limit == 0 {
            return;
        }
        let excess = self.commands.len().saturating_sub(self.undo_limit);
        let evict = excess.min(self.index);
        if evict > 0 {
            self.commands.drain(..evict);
            self.index -= evict;
            tracing::debug!(evicted = evict, "undo history trimmed");
        }
    }

    pub fn can_undo(&self) -> bool {
        self.open_macros.is_empty() && self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.open_macros.is_empty() && self.index < self.commands.len()
    }

    pub fn count(&self) -> usize {
        self.commands.len()
    }

    /// Cursor position: number of commands that can be undone
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn undo_text(&self) -> Option<&str> {
        self.index
            .checked_sub(1)
            .and_then(|i| self.commands.get(i))
            .map(|c| c.description())
    }

    pub fn redo_text(&self) -> Option<&str> {
        self.commands.get(self.index).map(|c| c.description())
    }

    pub fn command(&self, index: usize) -> Option<&dyn Command> {
        self.commands.get(index).map(|c| c.as_ref())
    }

    /// Forget all history, open macros included
    pub fn clear(&mut self) {
        self.commands.clear();
        self.open_macros.clear();
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{InsertItemCommand, SetDataCommand};
    use crate::model::{DetachedItem, ItemCatalogue, ItemPath, TagIndex, Variant};
    use mvx_core_types::Role;

    fn set(value: i64) -> Box<dyn Command> {
        Box::new(SetDataCommand::new(
            ItemPath::root(),
            Role::DATA,
            Variant::Int(value),
        ))
    }

    fn insert(model_type: &str) -> Box<dyn Command> {
        Box::new(InsertItemCommand::new(
            ItemPath::root(),
            TagIndex::append(""),
            DetachedItem::new(model_type),
        ))
    }

    fn setup() -> (Tree, EventNotifier, CommandStack) {
        (
            Tree::new(ItemCatalogue::default()),
            EventNotifier::new(),
            CommandStack::new(),
        )
    }

    #[test]
    fn test_execute_truncates_redo_branch() {
        let (mut tree, notifier, mut stack) = setup();
        stack.execute(set(1), &mut tree, &notifier).unwrap();
        stack.execute(set(2), &mut tree, &notifier).unwrap();
        stack.undo(&mut tree, &notifier).unwrap();
        assert!(stack.can_redo());

        stack.execute(set(3), &mut tree, &notifier).unwrap();

        assert_eq!(stack.count(), 2);
        assert_eq!(stack.index(), 2);
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_obsolete_command_not_recorded() {
        let (mut tree, notifier, mut stack) = setup();
        stack.execute(set(1), &mut tree, &notifier).unwrap();
        stack.execute(set(1), &mut tree, &notifier).unwrap();
        assert_eq!(stack.count(), 1);
    }

    #[test]
    fn test_failed_command_not_recorded() {
        let (mut tree, notifier, mut stack) = setup();
        let bad = Box::new(InsertItemCommand::new(
            ItemPath::root(),
            TagIndex::new("root", 5),
            DetachedItem::new("A"),
        ));
        assert!(stack.execute(bad, &mut tree, &notifier).is_err());
        assert_eq!(stack.count(), 0);
    }

    #[test]
    fn test_undo_redo_noop_at_ends() {
        let (mut tree, notifier, mut stack) = setup();
        stack.undo(&mut tree, &notifier).unwrap();
        stack.redo(&mut tree, &notifier).unwrap();
        assert_eq!(stack.index(), 0);
    }

    #[test]
    fn test_macro_groups_children() {
        let (mut tree, notifier, mut stack) = setup();
        stack.begin_macro("pair");
        stack.execute(insert("A"), &mut tree, &notifier).unwrap();
        stack.execute(insert("B"), &mut tree, &notifier).unwrap();
        assert!(!stack.can_undo());
        stack.end_macro().unwrap();

        assert_eq!(stack.count(), 1);
        assert_eq!(stack.undo_text(), Some("pair"));
        stack.undo(&mut tree, &notifier).unwrap();
        assert_eq!(tree.len(), 1);
        stack.redo(&mut tree, &notifier).unwrap();
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_nested_macros_fold_into_outer() {
        let (mut tree, notifier, mut stack) = setup();
        stack.begin_macro("outer");
        stack.execute(insert("A"), &mut tree, &notifier).unwrap();
        stack.begin_macro("inner");
        stack.execute(insert("B"), &mut tree, &notifier).unwrap();
        stack.end_macro().unwrap();
        stack.end_macro().unwrap();

        assert_eq!(stack.count(), 1);
        stack.undo(&mut tree, &notifier).unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_end_macro_without_begin() {
        let (_, _, mut stack) = setup();
        assert_eq!(stack.end_macro(), Err(MvxError::NoOpenMacro));
    }

    #[test]
    fn test_undo_limit_evicts_oldest_before_cursor() {
        let (mut tree, notifier, mut stack) = setup();
        for v in 1..=5 {
            stack.execute(set(v), &mut tree, &notifier).unwrap();
        }
        stack.undo(&mut tree, &notifier).unwrap();
        stack.undo(&mut tree, &notifier).unwrap();

        stack.set_undo_limit(2);

        // The three undoable entries go; redo entries are never evicted
        assert_eq!(stack.count(), 2);
        assert_eq!(stack.index(), 0);
        assert_eq!(stack.redo_text(), Some("set data of /"));

        stack.set_undo_limit(1);
        assert_eq!(stack.count(), 2);
    }

    #[test]
    fn test_failed_undo_keeps_cursor() {
        let (mut tree, notifier, mut stack) = setup();
        stack.execute(insert("A"), &mut tree, &notifier).unwrap();
        let child = tree.get_item(tree.root(), &TagIndex::new("root", 0)).unwrap();
        let root = tree.root();
        crate::composer::Composer::new(&mut tree, &notifier)
            .take_with(root, &TagIndex::new("root", 0), true)
            .unwrap();
        assert!(!tree.contains(child));

        assert!(stack.undo(&mut tree, &notifier).is_err());
        assert_eq!(stack.index(), 1);
    }
}
