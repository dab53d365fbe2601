//! Render command
//!
//! Usage: mvx render <FILE> [--strategy <KIND>] [--config <FILE>] [--root <ID>]

use clap::Args;
use std::path::PathBuf;

use mvx_core::projection::strategy_for;
use mvx_core::{ItemId, SessionConfig, StrategyKind, ViewModel};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// JSON model record
    pub file: PathBuf,

    /// Projection: mirror, property_table or children (overrides the config)
    #[arg(short, long)]
    pub strategy: Option<StrategyKind>,

    /// TOML session configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Identifier of the item to project from (default: the root)
    #[arg(short, long)]
    pub root: Option<String>,
}

/// Execute render command
pub fn execute(args: RenderArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    let kind = args.strategy.unwrap_or(config.projection.strategy);

    let model = super::load_model(&args.file)?;
    let tree = model.tree();
    let root = match &args.root {
        Some(id) => tree
            .find_item(&ItemId::from_string(id.as_str()))
            .ok_or_else(|| format!("no item with identifier {}", id))?,
        None => tree.root(),
    };

    let strategy = strategy_for(kind, tree, root)?;
    let view = ViewModel::attach_boxed(tree, model.notifier(), strategy);
    view.borrow_mut().set_root(tree, root)?;

    let view = view.borrow();
    let mut rows = vec![view.header_labels()];
    rows.extend(view.to_table(tree));
    print!("{}", format_table(&rows));
    Ok(())
}

/// Left-aligned columns separated by two spaces
fn format_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            rows.iter()
                .filter_map(|r| r.get(c))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_table_aligns_columns() {
        let rows = vec![
            vec!["Name".to_string(), "Value".to_string()],
            vec!["title".to_string(), "x".to_string()],
        ];
        assert_eq!(format_table(&rows), "Name   Value\ntitle  x\n");
    }
}
