use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let value = serde_json::json!({
            "schema": 1,
            "appName": "WeekFitter",
            "apiUrl": DEFAULT_API_URL,
        });
        let formatted = serde_json::to_string_pretty(&value)?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config(config_dir: &Path) -> Result<serde_json::Value, InfraError> {
    read_config(&config_dir.join(APP_JSON))
}

pub fn read_api_url(config_dir: &Path) -> Result<String, InfraError> {
    let app = load_app_config(config_dir)?;
    Ok(app
        .get("apiUrl")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_API_URL)
        .to_string())
}

pub fn read_app_name(config_dir: &Path) -> Result<String, InfraError> {
    let app = load_app_config(config_dir)?;
    let name = app
        .get("appName")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("WeekFitter");
    Ok(name.to_string())
}
