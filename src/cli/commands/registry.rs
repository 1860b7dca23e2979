use anyhow::Result;

use scenario::SessionConfig;
use scenario::networks::{abi_file, network_file, read_json_file};

pub(crate) fn cmd_registry_show(config: &SessionConfig, abi: bool) -> Result<()> {
    let dir = config
        .networks_dir
        .clone()
        .unwrap_or_else(|| config.base_path.join("networks"));
    let path = if abi {
        abi_file(&dir, &config.network)
    } else {
        network_file(&dir, &config.network)
    };
    let json = read_json_file(&path)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
