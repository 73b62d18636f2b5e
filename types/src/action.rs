use serde::{Deserialize, Serialize};

/// An action the editor host asks the infoview to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InfoviewAction {
    TogglePaused,
    ToggleAllMessages,
    CopyToComment,
    TogglePin,
}
