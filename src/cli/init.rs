//! crew init command implementation
//!
//! Creates the store directories and a default `.crew.toml`.

use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::storage::Storage;

use super::GlobalOptions;

#[derive(serde::Serialize)]
struct InitReport {
    store: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    store: bool,
    config: bool,
}

pub fn run(globals: &GlobalOptions) -> Result<()> {
    let root = Storage::resolve_root(globals.store.as_deref())?;
    let storage = Storage::open(root);
    let created_store = !storage.is_initialized();
    storage.init()?;

    let config_path = storage.config_file();
    let created_config = if config_path.exists() {
        false
    } else {
        Config::default().save(&config_path)?;
        true
    };
    tracing::info!(store = %storage.root().display(), created_config, "store initialized");

    let report = InitReport {
        store: storage.root().to_path_buf(),
        created: InitCreated {
            store: created_store,
            config: created_config,
        },
    };

    let header = if created_store || created_config {
        format!("crew init: initialized {}", storage.root().display())
    } else {
        format!("crew init: already initialized at {}", storage.root().display())
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("store", storage.root().display().to_string());
    if created_config {
        human.push_summary("created", CONFIG_FILE);
    }
    human.push_next_step("crew user set <name>");
    human.push_next_step("crew team new <name> --member <name:role[:capacity]>");

    emit_success(globals.output(), "init", &report, Some(&human))
}
