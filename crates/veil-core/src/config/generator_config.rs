use serde::{Deserialize, Serialize};

/// Options forwarded to the external substitute generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Locale hint, e.g. `en_US`.
    pub locale: Option<String>,
    /// Seed for reproducible fake data.
    pub seed: Option<u64>,
}
