//! Reversible mutations and the undo/redo stack
//!
//! - [`Command`]: execute/undo pair with a checked lifecycle
//! - [`CommandStack`]: history with a cursor, macro grouping and an undo limit
//! - concrete commands for insert, remove, set-data, move and tag registration

pub mod command;
pub mod item_commands;
pub mod macro_command;
pub mod stack;

pub use command::{Command, CommandPhase, CommandResult, CommandState};
pub use item_commands::{
    InsertItemCommand, MoveItemCommand, RegisterTagCommand, RemoveItemCommand, SetDataCommand,
};
pub use macro_command::MacroCommand;
pub use stack::CommandStack;
