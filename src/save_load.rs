use std::path::{Path, PathBuf};

use crate::blueprint::{Blueprint, BlueprintError};

pub fn write_blueprint(path: &Path, blueprint: &Blueprint) -> Result<(), BlueprintError> {
    std::fs::write(path, blueprint.to_json()?)?;
    log::info!(
        "Saved blueprint \"{}\" to: {}",
        blueprint.name,
        path.display()
    );
    Ok(())
}

pub fn read_blueprint(path: &Path) -> Result<Blueprint, BlueprintError> {
    let json = std::fs::read_to_string(path)?;
    let blueprint = Blueprint::from_json(&json)?;
    log::info!(
        "Loaded blueprint \"{}\" ({} components, {} wires) from: {}",
        blueprint.name,
        blueprint.components.len(),
        blueprint.wires.len(),
        path.display()
    );
    Ok(blueprint)
}

fn file_name(blueprint: &Blueprint) -> String {
    let stem: String = blueprint
        .name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{stem}.json")
}

/// Ask for a destination and write `blueprint` there. `Ok(None)` when the dialog is dismissed.
#[cfg(not(target_arch = "wasm32"))]
pub fn save_blueprint_dialog(blueprint: &Blueprint) -> Result<Option<PathBuf>, BlueprintError> {
    let Some(path) = rfd::FileDialog::new()
        .add_filter("Blueprint", &["json"])
        .set_file_name(file_name(blueprint))
        .save_file()
    else {
        return Ok(None);
    };

    write_blueprint(&path, blueprint)?;
    Ok(Some(path))
}

/// Ask for a blueprint file and parse it. `Ok(None)` when the dialog is dismissed.
#[cfg(not(target_arch = "wasm32"))]
pub fn load_blueprint_dialog() -> Result<Option<Blueprint>, BlueprintError> {
    let Some(path) = rfd::FileDialog::new()
        .add_filter("Blueprint", &["json"])
        .pick_file()
    else {
        return Ok(None);
    };

    read_blueprint(&path).map(Some)
}
