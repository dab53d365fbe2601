//! Concrete commands for the tree mutations
//!
//! Commands never keep handles. Insert, remove and set-data address their
//! target by [`ItemPath`]; move uses identifiers because both ends of a move
//! can shift each other's paths.

use mvx_core_types::{ItemId, Role};

use super::command::{Command, CommandResult, CommandState};
use crate::composer::{Composer, ModelComposer};
use crate::errors::{MvxError, Result};
use crate::model::{CloneMode, DetachedItem, ItemHandle, ItemPath, TagIndex, TagInfo, Variant};
use crate::ops::Tree;

fn missing(what: &str) -> MvxError {
    MvxError::Internal {
        message: format!("command has no {}", what),
    }
}

fn find(tree: &Tree, identifier: &ItemId) -> Result<ItemHandle> {
    tree.find_item(identifier)
        .ok_or_else(|| MvxError::IdentifierNotFound {
            identifier: identifier.to_string(),
        })
}

/// Concrete tag index (tag name resolved, row fixed) of a prospective insertion
fn insertion_point(tree: &Tree, parent: ItemHandle, tag_index: &TagIndex, item: &DetachedItem) -> Result<TagIndex> {
    let (_, row) = tree.check_insert(parent, tag_index, item)?;
    let tag = tree.item(parent)?.tags().resolve_tag(&tag_index.tag)?;
    Ok(TagIndex::new(tag, row))
}

/// Insert a subtree; undo takes it back out and keeps it for redo
#[derive(Debug)]
pub struct InsertItemCommand {
    state: CommandState,
    parent: ItemPath,
    tag_index: TagIndex,
    pending: Option<DetachedItem>,
    inserted_at: Option<TagIndex>,
}

impl InsertItemCommand {
    pub fn new(parent: ItemPath, tag_index: TagIndex, item: DetachedItem) -> Self {
        Self {
            state: CommandState::new(format!("insert {}", item.model_type())),
            parent,
            tag_index,
            pending: Some(item),
            inserted_at: None,
        }
    }
}

impl Command for InsertItemCommand {
    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }

    fn execute_command(&mut self, composer: &mut Composer<'_>) -> Result<CommandResult> {
        let parent = composer.tree().resolve_path(&self.parent)?;
        let item = self.pending.as_ref().ok_or_else(|| missing("pending item"))?;
        let requested = self.inserted_at.as_ref().unwrap_or(&self.tag_index);
        let at = insertion_point(composer.tree(), parent, requested, item)?;

        let item = self.pending.take().ok_or_else(|| missing("pending item"))?;
        let handle = composer.insert_item(item, parent, &at)?;
        self.inserted_at = Some(at);
        Ok(CommandResult::Inserted(handle))
    }

    fn undo_command(&mut self, composer: &mut Composer<'_>) -> Result<()> {
        let parent = composer.tree().resolve_path(&self.parent)?;
        let at = self.inserted_at.clone().ok_or_else(|| missing("insertion point"))?;
        let item = composer.take_with(parent, &at, false)?;
        self.pending = Some(item);
        Ok(())
    }
}

/// Remove a subtree; the command owns it until undone
#[derive(Debug)]
pub struct RemoveItemCommand {
    state: CommandState,
    parent: ItemPath,
    tag_index: TagIndex,
    removed_at: Option<TagIndex>,
    backup: Option<DetachedItem>,
}

impl RemoveItemCommand {
    pub fn new(parent: ItemPath, tag_index: TagIndex) -> Self {
        Self {
            state: CommandState::new(format!("remove {}", tag_index)),
            parent,
            tag_index,
            removed_at: None,
            backup: None,
        }
    }

    /// Subtree held between execute and undo
    pub fn backup(&self) -> Option<&DetachedItem> {
        self.backup.as_ref()
    }
}

impl Command for RemoveItemCommand {
    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }

    fn execute_command(&mut self, composer: &mut Composer<'_>) -> Result<CommandResult> {
        let parent = composer.tree().resolve_path(&self.parent)?;
        let requested = self.removed_at.as_ref().unwrap_or(&self.tag_index);
        let (_, row, _) = composer.tree().check_take(parent, requested, true)?;
        let tag = composer
            .tree()
            .item(parent)?
            .tags()
            .resolve_tag(&requested.tag)?
            .to_string();
        let at = TagIndex::new(tag, row);

        let removed = composer.take_item(parent, &at)?;
        let copy = removed.clone_item(CloneMode::Restore);
        self.backup = Some(removed);
        self.removed_at = Some(at);
        Ok(CommandResult::Removed(copy))
    }

    fn undo_command(&mut self, composer: &mut Composer<'_>) -> Result<()> {
        let parent = composer.tree().resolve_path(&self.parent)?;
        let at = self.removed_at.clone().ok_or_else(|| missing("removal point"))?;
        let item = self.backup.as_ref().ok_or_else(|| missing("backup"))?;
        composer.tree().check_insert(parent, &at, item)?;

        let item = self.backup.take().ok_or_else(|| missing("backup"))?;
        composer.insert_item(item, parent, &at)?;
        Ok(())
    }
}

/// Store a role value; obsolete when the value does not change
#[derive(Debug)]
pub struct SetDataCommand {
    state: CommandState,
    item: ItemPath,
    role: Role,
    value: Variant,
    previous: Option<Variant>,
}

impl SetDataCommand {
    pub fn new(item: ItemPath, role: Role, value: Variant) -> Self {
        Self {
            state: CommandState::new(format!("set {} of {}", role.name(), item)),
            item,
            role,
            value,
            previous: None,
        }
    }
}

impl Command for SetDataCommand {
    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }

    fn execute_command(&mut self, composer: &mut Composer<'_>) -> Result<CommandResult> {
        let item = composer.tree().resolve_path(&self.item)?;
        let previous = composer.tree().data(item, self.role)?.cloned();
        let changed = composer.set_data(item, self.role, self.value.clone())?;
        self.previous = previous;
        if !changed {
            self.state.obsolete = true;
        }
        Ok(CommandResult::DataChanged(changed))
    }

    fn undo_command(&mut self, composer: &mut Composer<'_>) -> Result<()> {
        let item = composer.tree().resolve_path(&self.item)?;
        match self.previous.clone() {
            Some(previous) => {
                composer.set_data(item, self.role, previous)?;
            }
            None => {
                composer.remove_data(item, self.role)?;
            }
        }
        Ok(())
    }
}

/// Declare a tag on an attached item; undo withdraws it while it is empty
#[derive(Debug)]
pub struct RegisterTagCommand {
    state: CommandState,
    item: ItemPath,
    info: TagInfo,
    set_default: bool,
}

impl RegisterTagCommand {
    pub fn new(item: ItemPath, info: TagInfo, set_default: bool) -> Self {
        Self {
            state: CommandState::new(format!("register tag '{}' on {}", info.name, item)),
            item,
            info,
            set_default,
        }
    }
}

impl Command for RegisterTagCommand {
    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }

    fn execute_command(&mut self, composer: &mut Composer<'_>) -> Result<CommandResult> {
        let item = composer.tree().resolve_path(&self.item)?;
        composer.register_tag(item, self.info.clone(), self.set_default)?;
        Ok(CommandResult::None)
    }

    fn undo_command(&mut self, composer: &mut Composer<'_>) -> Result<()> {
        let item = composer.tree().resolve_path(&self.item)?;
        composer.unregister_tag(item, &self.info.name)?;
        Ok(())
    }
}

/// Move an item to a new parent; undo moves it back to its old position
#[derive(Debug)]
pub struct MoveItemCommand {
    state: CommandState,
    item: ItemId,
    new_parent: ItemId,
    tag_index: TagIndex,
    origin: Option<(ItemId, TagIndex)>,
    moved_to: Option<TagIndex>,
}

impl MoveItemCommand {
    pub fn new(item: ItemId, new_parent: ItemId, tag_index: TagIndex) -> Self {
        Self {
            state: CommandState::new(format!("move to {}", tag_index)),
            item,
            new_parent,
            tag_index,
            origin: None,
            moved_to: None,
        }
    }
}

impl Command for MoveItemCommand {
    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }

    fn execute_command(&mut self, composer: &mut Composer<'_>) -> Result<CommandResult> {
        let tree = composer.tree();
        let item = find(tree, &self.item)?;
        let new_parent = find(tree, &self.new_parent)?;
        let (old_parent, old_index) = tree.location(item)?.ok_or_else(|| MvxError::RootImmutable {
            op: "move".to_string(),
        })?;
        let origin = (tree.identifier(old_parent)?.clone(), old_index);
        let target = self.moved_to.clone().unwrap_or_else(|| self.tag_index.clone());

        composer.move_item(item, new_parent, &target)?;
        let moved_to = composer
            .tree()
            .tag_index_of(item)?
            .ok_or_else(|| missing("target position"))?;
        if origin.0 == self.new_parent && origin.1 == moved_to {
            self.state.obsolete = true;
        }
        self.origin = Some(origin);
        self.moved_to = Some(moved_to);
        Ok(CommandResult::Moved)
    }

    fn undo_command(&mut self, composer: &mut Composer<'_>) -> Result<()> {
        let (origin_parent, origin_index) = self.origin.clone().ok_or_else(|| missing("origin"))?;
        let item = find(composer.tree(), &self.item)?;
        let parent = find(composer.tree(), &origin_parent)?;
        composer.move_item(item, parent, &origin_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventNotifier;
    use crate::model::{ItemCatalogue, TagInfo};

    fn setup() -> (Tree, EventNotifier) {
        (Tree::new(ItemCatalogue::default()), EventNotifier::new())
    }

    #[test]
    fn test_insert_undo_redo_preserves_identifier() {
        let (mut tree, notifier) = setup();
        let mut composer = Composer::new(&mut tree, &notifier);
        let item = DetachedItem::new("A");
        let id = item.identifier().clone();
        let mut cmd = InsertItemCommand::new(ItemPath::root(), TagIndex::append(""), item);

        cmd.execute(&mut composer).unwrap();
        cmd.undo(&mut composer).unwrap();
        assert_eq!(composer.tree().find_item(&id), None);

        let handle = cmd.execute(&mut composer).unwrap().into_inserted().unwrap();
        assert_eq!(composer.tree().find_item(&id), Some(handle));
    }

    #[test]
    fn test_register_tag_undo_withdraws_empty_tag() {
        let (mut tree, notifier) = setup();
        let mut composer = Composer::new(&mut tree, &notifier);
        let root = composer.tree().root();
        let mut cmd = RegisterTagCommand::new(ItemPath::root(), TagInfo::universal("extra"), false);

        cmd.execute(&mut composer).unwrap();
        composer
            .insert_item(DetachedItem::new("A"), root, &TagIndex::append("extra"))
            .unwrap();
        assert!(matches!(
            cmd.undo(&mut composer),
            Err(MvxError::TagNotEmpty { .. })
        ));

        composer.take_item(root, &TagIndex::new("extra", 0)).unwrap();
        cmd.undo(&mut composer).unwrap();
        assert!(!composer.tree().item(root).unwrap().tags().is_registered("extra"));
    }

    #[test]
    fn test_insert_failure_keeps_pending_item() {
        let (mut tree, notifier) = setup();
        let mut composer = Composer::new(&mut tree, &notifier);
        let mut cmd = InsertItemCommand::new(
            ItemPath::root(),
            TagIndex::new("nope", 0),
            DetachedItem::new("A"),
        );

        assert!(matches!(
            cmd.execute(&mut composer),
            Err(MvxError::TagNotRegistered { .. })
        ));
        assert!(cmd.pending.is_some());
    }

    #[test]
    fn test_remove_returns_restore_copy_and_undo_reinserts() {
        let (mut tree, notifier) = setup();
        let mut composer = Composer::new(&mut tree, &notifier);
        let root = composer.tree().root();
        let mut vector = ItemCatalogue::default().create("Vector").unwrap();
        vector.set_property("X", 4.0).unwrap();
        let ids = vector.identifiers();
        composer
            .insert_item(vector, root, &TagIndex::append(""))
            .unwrap();

        let mut cmd = RemoveItemCommand::new(ItemPath::root(), TagIndex::new("root", 0));
        let removed = cmd.execute(&mut composer).unwrap().into_removed().unwrap();
        assert_eq!(removed.identifiers(), ids);
        assert_eq!(composer.tree().len(), 1);

        cmd.undo(&mut composer).unwrap();
        let restored = composer.tree().find_item(&ids[0]).unwrap();
        let x = composer
            .tree()
            .get_item(restored, &TagIndex::new("X", 0))
            .unwrap();
        assert_eq!(
            composer.tree().data(x, Role::DATA),
            Ok(Some(&Variant::Double(4.0)))
        );
    }

    #[test]
    fn test_set_data_undo_removes_role_that_was_absent() {
        let (mut tree, notifier) = setup();
        let mut composer = Composer::new(&mut tree, &notifier);
        let root = composer.tree().root();
        let mut cmd = SetDataCommand::new(ItemPath::root(), Role::USER, Variant::Int(5));

        cmd.execute(&mut composer).unwrap();
        assert_eq!(
            composer.tree().data(root, Role::USER),
            Ok(Some(&Variant::Int(5)))
        );
        cmd.undo(&mut composer).unwrap();
        assert_eq!(composer.tree().data(root, Role::USER), Ok(None));
    }

    #[test]
    fn test_set_data_same_value_is_obsolete() {
        let (mut tree, notifier) = setup();
        let mut composer = Composer::new(&mut tree, &notifier);
        let root = composer.tree().root();
        composer.set_data(root, Role::DATA, Variant::Int(1)).unwrap();

        let mut cmd = SetDataCommand::new(ItemPath::root(), Role::DATA, Variant::Int(1));
        let result = cmd.execute(&mut composer).unwrap();

        assert_eq!(result, CommandResult::DataChanged(false));
        assert!(cmd.is_obsolete());
    }

    #[test]
    fn test_move_undo_restores_position() {
        let (mut tree, notifier) = setup();
        let mut composer = Composer::new(&mut tree, &notifier);
        let root = composer.tree().root();
        let a = composer
            .insert_item(DetachedItem::new("A"), root, &TagIndex::append(""))
            .unwrap();
        let mut target = DetachedItem::new("Container");
        target
            .register_default_tag(TagInfo::universal("items"))
            .unwrap();
        let target = composer
            .insert_item(target, root, &TagIndex::append(""))
            .unwrap();
        let a_id = composer.tree().identifier(a).unwrap().clone();
        let target_id = composer.tree().identifier(target).unwrap().clone();

        let mut cmd = MoveItemCommand::new(a_id, target_id, TagIndex::append(""));
        cmd.execute(&mut composer).unwrap();
        assert_eq!(composer.tree().parent(a), Ok(Some(target)));

        cmd.undo(&mut composer).unwrap();
        assert_eq!(
            composer.tree().location(a),
            Ok(Some((root, TagIndex::new("root", 0))))
        );
    }
}
