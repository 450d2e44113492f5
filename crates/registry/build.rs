use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

const SERVICE_TYPES: [&str; 3] = ["web", "data", "ingest"];
const ROOT_SNAPSHOT: &str = "root_registry_sea1.json";

fn main() -> Result<()> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    // Source data: top-level config/*.json
    let config_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?).join("..").join("..").join("config");

    let mut catalog = Map::new();
    for service_type in SERVICE_TYPES {
        let path = config_dir.join(format!("{service_type}_services.json"));
        println!("cargo:rerun-if-changed={}", path.display());
        let content = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let services: Value = serde_json::from_str(&content).with_context(|| format!("parse {}", path.display()))?;
        catalog.insert(service_type.to_string(), services);
    }
    fs::write(out_dir.join("catalog.json"), serde_json::to_string(&Value::Object(catalog))?)?;

    let snapshot_path = config_dir.join(ROOT_SNAPSHOT);
    println!("cargo:rerun-if-changed={}", snapshot_path.display());
    let snapshot = fs::read_to_string(&snapshot_path).with_context(|| format!("read {}", snapshot_path.display()))?;
    serde_json::from_str::<Value>(&snapshot).with_context(|| format!("parse {}", snapshot_path.display()))?;
    fs::write(out_dir.join(ROOT_SNAPSHOT), snapshot)?;

    Ok(())
}
