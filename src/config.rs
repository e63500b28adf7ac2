//! Dataset names and tuning values for the two operations.
//!
//! ```
//! use hydro_trace::Config;
//!
//! let config = Config::from_json_str(r#"{
//!     "flow_path": {
//!         "high_resolution_flow_direction": "tile_a;tile_b",
//!         "low_resolution_flow_direction": "flowdir_500m"
//!     }
//! }"#).unwrap();
//! assert_eq!(config.flow_path.high_resolution_flow_direction, vec!["tile_a", "tile_b"]);
//! assert_eq!(config.flow_path.trace.high_res_max_steps, 100);
//! ```

use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::error::Result;

/// Step budgets for the two tracing passes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub high_res_max_steps: usize,
    pub low_res_max_steps: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            high_res_max_steps: 100,
            low_res_max_steps: 65535,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlowPathConfig {
    #[serde(deserialize_with = "name_list")]
    pub high_resolution_flow_direction: Vec<String>,
    pub low_resolution_flow_direction: String,
    #[serde(flatten)]
    pub trace: TraceConfig,
}

impl Default for FlowPathConfig {
    fn default() -> Self {
        Self {
            high_resolution_flow_direction: Vec::new(),
            low_resolution_flow_direction: "flow_direction".into(),
            trace: TraceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpstreamAreaConfig {
    pub flow_accumulation: String,
    #[serde(deserialize_with = "name_list")]
    pub high_resolution_flow_direction: Vec<String>,
    pub low_resolution_flow_direction: String,
    /// High resolution data is only tried where accumulation is at or below this.
    pub high_res_accum_threshold: f64,
    pub flow_area: Option<String>,
    pub flow_line: Option<String>,
}

impl Default for UpstreamAreaConfig {
    fn default() -> Self {
        Self {
            flow_accumulation: "flow_accumulation".into(),
            high_resolution_flow_direction: Vec::new(),
            low_resolution_flow_direction: "flow_direction".into(),
            high_res_accum_threshold: 20.0,
            flow_area: None,
            flow_line: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub flow_path: FlowPathConfig,
    pub upstream_area: UpstreamAreaConfig,
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Accepts either a list of names or a single `;` separated string.
fn name_list<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Names {
        Joined(String),
        List(Vec<String>),
    }

    let names = match Names::deserialize(deserializer)? {
        Names::Joined(s) => s.split(';').map(str::to_string).collect(),
        Names::List(v) => v,
    };
    Ok(names.into_iter().map(|n| n.trim().to_string()).filter(|n| !n.is_empty()).collect())
}
