//! Config file loading.
//!
//! Two formats are recognized: JSON (any extension ending in `.json`) and
//! INI with a `[settings]` section. INI values are coerced to booleans and
//! numbers where they parse as such, then funneled through the same serde
//! struct as JSON so both formats share one schema.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::LabelError;

/// Raw config-file layer. Every field is optional; unset fields fall
/// through to the defaults layer. Unknown keys (including the `_comment`
/// convention used by bundled presets) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub margin: Option<f32>,
    pub dpi: Option<u32>,
    pub delimiter: Option<String>,
    pub dm_scale: Option<f32>,
    pub eac_image: Option<String>,
    pub eac_height: Option<f32>,
    pub no_pdf: Option<bool>,
    pub template: Option<String>,
    pub dm_position: Option<String>,
    pub dm_size: Option<f32>,
    pub dm_margin: Option<f32>,
    pub no_eac: Option<bool>,
    pub no_product_name: Option<bool>,
    pub text_below_dm: Option<bool>,
    pub transparent_bg: Option<bool>,
    pub template_type: Option<String>,
    pub csv_file: Option<String>,
    pub template_pdf: Option<String>,
    pub output_pdf: Option<String>,
    pub dm_x: Option<f32>,
    pub dm_y: Option<f32>,
    pub datamatrix_column: Option<usize>,
    pub text_column: Option<usize>,
    pub text_start: Option<usize>,
    pub text_length: Option<usize>,
    pub text_font_size: Option<f32>,
    pub text_offset_x: Option<f32>,
    pub text_offset_y: Option<f32>,
    pub text_color: Option<String>,
    pub labels_horizontal: Option<u32>,
    pub labels_vertical: Option<u32>,
    pub label_width: Option<f32>,
    pub label_height: Option<f32>,
    pub label_margin_left: Option<f32>,
    pub label_margin_top: Option<f32>,
    pub label_spacing_horizontal: Option<f32>,
    pub label_spacing_vertical: Option<f32>,
}

impl FileConfig {
    /// Load a config file, dispatching on extension.
    pub fn load(path: &Path) -> Result<FileConfig, LabelError> {
        let raw = std::fs::read_to_string(path).map_err(|source| LabelError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&raw)
        } else {
            Self::from_ini(&raw)
        }
    }

    pub fn from_json(raw: &str) -> Result<FileConfig, LabelError> {
        serde_json::from_str(raw)
            .map_err(|e| LabelError::Config(format!("invalid JSON config: {e}")))
    }

    /// Parse an INI file with a `[settings]` section into the shared schema.
    pub fn from_ini(raw: &str) -> Result<FileConfig, LabelError> {
        let mut map = Map::new();
        let mut in_settings = false;

        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                in_settings = section.trim().eq_ignore_ascii_case("settings");
                continue;
            }
            if !in_settings {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(LabelError::Config(format!("invalid INI line: {line:?}")));
            };
            map.insert(key.trim().to_string(), coerce_ini_value(value.trim()));
        }

        serde_json::from_value(Value::Object(map))
            .map_err(|e| LabelError::Config(format!("invalid INI config: {e}")))
    }
}

/// Coerce an INI string to the most specific JSON type it parses as.
fn coerce_ini_value(value: &str) -> Value {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" => return Value::Bool(true),
        "false" | "no" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = value.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = value.parse::<f64>()
        && let Some(n) = serde_json::Number::from_f64(f)
    {
        return Value::Number(n);
    }
    Value::String(value.to_string())
}
