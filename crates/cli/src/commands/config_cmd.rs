//! `apoyo config` — Initialize or inspect configuration.

use apoyo_config::AppConfig;

pub fn run(init: bool) -> Result<(), Box<dyn std::error::Error>> {
    if init {
        let dir = AppConfig::config_dir();
        let path = dir.join("config.toml");
        if path.exists() {
            return Err(format!("Config file already exists at {}", path.display()).into());
        }
        std::fs::create_dir_all(&dir)?;
        std::fs::write(&path, AppConfig::default_toml())?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{config:#?}");
    if !config.has_api_key() {
        println!();
        println!("Note: no API key configured. Set APOYO_API_KEY or GROQ_API_KEY.");
    }
    Ok(())
}
