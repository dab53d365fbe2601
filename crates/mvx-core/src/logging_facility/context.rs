//! Model context attached to boundary log events

use mvx_core_types::Role;

use crate::commands::CommandStack;
use crate::model::TagIndex;

/// What a boundary operation addressed
///
/// Each set field is logged under its schema key (`item_id`, `tag`, `row`,
/// `role`, `stack_index`, `stack_count`); unset fields are left out of the
/// event entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpContext {
    pub model_type: String,
    pub item_id: Option<String>,
    pub tag: Option<String>,
    pub row: Option<usize>,
    pub role: Option<Role>,
    pub stack_index: Option<usize>,
    pub stack_count: Option<usize>,
}

impl OpContext {
    pub fn new(model_type: impl Into<String>) -> Self {
        Self {
            model_type: model_type.into(),
            ..Self::default()
        }
    }

    pub fn with_item_id(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Tag and row of a position; an empty tag name stays unset and an
    /// append position carries no row
    pub fn with_tag_index(mut self, tag_index: &TagIndex) -> Self {
        if !tag_index.tag.is_empty() {
            self.tag = Some(tag_index.tag.clone());
        }
        if !tag_index.is_append() {
            self.row = Some(tag_index.row);
        }
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Cursor and length of the undo stack after the operation
    pub fn with_stack(mut self, stack: &CommandStack) -> Self {
        self.stack_index = Some(stack.index());
        self.stack_count = Some(stack.count());
        self
    }

    pub fn role_value(&self) -> Option<u16> {
        self.role.map(Role::value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_position_has_no_row() {
        let ctx = OpContext::new("Session").with_tag_index(&TagIndex::append("items"));
        assert_eq!(ctx.tag.as_deref(), Some("items"));
        assert_eq!(ctx.row, None);

        let ctx = OpContext::new("Session").with_tag_index(&TagIndex::new("", 2));
        assert_eq!(ctx.tag, None);
        assert_eq!(ctx.row, Some(2));
    }

    #[test]
    fn test_stack_fields_follow_cursor() {
        let stack = CommandStack::new();
        let ctx = OpContext::new("Session").with_stack(&stack);
        assert_eq!((ctx.stack_index, ctx.stack_count), (Some(0), Some(0)));
    }
}
