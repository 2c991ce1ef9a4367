//! Status document read from stdin.
//!
//! Every field is optional; missing values take the documented defaults.

use serde::{Deserialize, Deserializer};

const DEFAULT_MODEL: &str = "Claude";
const DEFAULT_SESSION: &str = "unknown";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatusInput {
    #[serde(deserialize_with = "null_as_default")]
    pub model: ModelInfo,
    pub session_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub cost: CostInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub context_window: ContextWindow,
    #[serde(deserialize_with = "null_as_default")]
    pub workspace: Workspace,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelInfo {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CostInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub total_cost_usd: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContextWindow {
    #[serde(deserialize_with = "null_as_default")]
    pub context_window_size: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_input_tokens: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_output_tokens: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Workspace {
    pub project_dir: Option<String>,
    pub current_dir: Option<String>,
}

impl StatusInput {
    /// Parse the stdin document. Blank input counts as `{}`.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text)
    }

    pub fn model_name(&self) -> &str {
        non_empty(self.model.display_name.as_deref()).unwrap_or(DEFAULT_MODEL)
    }

    pub fn session_id(&self) -> &str {
        non_empty(self.session_id.as_deref()).unwrap_or(DEFAULT_SESSION)
    }

    /// Project directory, falling back to the current directory.
    pub fn workspace_dir(&self) -> Option<&str> {
        non_empty(self.workspace.project_dir.as_deref())
            .or_else(|| non_empty(self.workspace.current_dir.as_deref()))
    }
}

/// Present-but-null fields take the same default as absent ones.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
