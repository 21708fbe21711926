//! List the model catalog

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use chat0_models::auth::{CredentialSource, EnvCredentials};
use chat0_models::{ModelDescriptor, ProviderKind};

use crate::config::Chat0Config;

/// Print every selectable model with its provider and key status.
pub fn run(config: &Chat0Config) -> Result<()> {
    let registry = config.registry();
    let credentials = EnvCredentials;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Model").fg(Color::Cyan),
        Cell::new("Provider").fg(Color::Cyan),
        Cell::new("Upstream id").fg(Color::Cyan),
        Cell::new("Max output").fg(Color::Cyan),
        Cell::new("Key").fg(Color::Cyan),
    ]);

    for model in registry.models() {
        table.add_row(vec![
            Cell::new(&model.display_name),
            Cell::new(&model.provider),
            Cell::new(&model.provider_model_id),
            Cell::new(
                model
                    .max_output_tokens
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            key_cell(model, &credentials),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn key_cell(model: &ModelDescriptor, credentials: &dyn CredentialSource) -> Cell {
    match model.provider_kind() {
        Ok(kind) if credentials.get_key(kind.as_str()).is_some() => Cell::new("yes").fg(Color::Green),
        Ok(kind) => Cell::new(format!("set {}", kind.env_var())).fg(Color::Yellow),
        Err(_) => Cell::new("unsupported").fg(Color::Red),
    }
}
