//! Inspect command
//!
//! Usage: mvx inspect <FILE>

use clap::Args;
use std::path::PathBuf;

use mvx_core::model::ItemHandle;
use mvx_core::ops::Tree;
use mvx_core::Role;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// JSON model record
    pub file: PathBuf,
}

/// Execute inspect command
pub fn execute(args: InspectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let model = super::load_model(&args.file)?;
    let tree = model.tree();
    println!("{} ({} items)", model.model_type(), tree.len());
    let mut lines = Vec::new();
    describe(tree, tree.root(), 0, &mut lines)?;
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

fn describe(
    tree: &Tree,
    handle: ItemHandle,
    depth: usize,
    lines: &mut Vec<String>,
) -> mvx_core::Result<()> {
    let item = tree.item(handle)?;
    let position = tree
        .tag_index_of(handle)?
        .map(|at| format!("{} ", at))
        .unwrap_or_default();
    let value = item
        .data(Role::DATA)
        .map(|v| format!(" = {}", v))
        .unwrap_or_default();
    lines.push(format!(
        "{}{}{} [{}] {}{}",
        "  ".repeat(depth),
        position,
        item.display_name(),
        item.model_type(),
        item.identifier(),
        value
    ));
    for child in tree.children(handle)? {
        describe(tree, child, depth + 1, lines)?;
    }
    Ok(())
}
