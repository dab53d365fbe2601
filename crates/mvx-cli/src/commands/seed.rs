//! Seed command
//!
//! Usage: mvx seed <OUT> [--vectors <N>]

use clap::Args;
use std::path::PathBuf;

use mvx_core::model::TagIndex;
use mvx_core::{Role, SessionModel};

#[derive(Debug, Args)]
pub struct SeedArgs {
    /// Output file for the JSON record
    pub out: PathBuf,

    /// Number of vectors in the sample container
    #[arg(long, default_value_t = 3)]
    pub vectors: usize,
}

/// Execute seed command
pub fn execute(args: SeedArgs) -> Result<(), Box<dyn std::error::Error>> {
    let model = sample_model(args.vectors)?;
    let json = model.to_record()?.to_json()?;
    std::fs::write(&args.out, json)?;
    println!("✓ Wrote model record to {}", args.out.display());
    Ok(())
}

/// A titled container of vectors with distinct coordinates
fn sample_model(vectors: usize) -> mvx_core::Result<SessionModel> {
    let mut model = SessionModel::new("Session");
    let root = model.root_item();

    let title = model.insert_new_item("Property", root, &TagIndex::append(""))?;
    model.set_data(title, Role::DISPLAY, "title")?;
    model.set_data(title, Role::DATA, "Sample session")?;

    let shapes = model.insert_new_item("Container", root, &TagIndex::append(""))?;
    model.set_data(shapes, Role::DISPLAY, "shapes")?;

    for i in 0..vectors {
        let vector = model.insert_new_item("Vector", shapes, &TagIndex::append(""))?;
        model.set_data(vector, Role::DISPLAY, format!("v{}", i))?;
        for (axis, offset) in [("X", 0.0), ("Y", 0.5), ("Z", 1.0)] {
            let property = model.tree().get_item(vector, &TagIndex::new(axis, 0))?;
            model.set_data(property, Role::DATA, i as f64 + offset)?;
        }
    }
    Ok(model)
}
