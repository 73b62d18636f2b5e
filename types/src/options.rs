use serde::{Deserialize, Serialize};

// Default value functions for serde (bool::default() is false, so true needs a fn)
const fn default_true() -> bool {
    true
}

/// Display options pushed by the editor host.
///
/// The engine owns no persistence for these; every push replaces the
/// previous snapshot wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayOptions {
    /// Show every diagnostic on the cursor line, regardless of column.
    #[serde(default = "default_true")]
    pub all_errors_on_line: bool,
    /// Show the expected type (term goal) section.
    #[serde(default = "default_true")]
    pub show_expected_type: bool,
    /// Throttle interval (ms) for goal updates while the worker is idle.
    /// Absent means the locally configured interval applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_time: Option<u64>,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            all_errors_on_line: true,
            show_expected_type: true,
            debounce_time: None,
        }
    }
}
