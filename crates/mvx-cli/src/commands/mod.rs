pub mod inspect;
pub mod render;
pub mod seed;

use std::path::Path;

use mvx_core::{ItemCatalogue, ModelRecord, SessionModel};

/// Read a JSON record into a live model
pub(crate) fn load_model(path: &Path) -> Result<SessionModel, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let record = ModelRecord::from_json(&text)?;
    Ok(SessionModel::from_record(record, ItemCatalogue::default())?)
}
