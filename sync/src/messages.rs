//! Deterministic ordering and stable keys for displayed message lists.

use std::collections::HashMap;

use infoview_types::Diagnostic;

/// A diagnostic paired with a key that stays the same across re-renders.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedMessage {
    pub key: String,
    pub diagnostic: Diagnostic,
}

/// Sort by where each message's full range ends, then assign keys.
///
/// Keys are `line:character` of the range start. Later messages sharing a
/// start get `:1`, `:2`, ... appended in display order, so distinct
/// messages never share a key.
#[must_use]
pub fn order_messages(diagnostics: impl IntoIterator<Item = Diagnostic>) -> Vec<KeyedMessage> {
    let mut sorted: Vec<Diagnostic> = diagnostics.into_iter().collect();
    // `sort_by_key` is stable: equal ends keep their publish order.
    sorted.sort_by_key(|d| d.full_range().end);

    let mut seen: HashMap<String, usize> = HashMap::new();
    sorted
        .into_iter()
        .map(|diagnostic| {
            let start = diagnostic.range().start;
            let base = format!("{}:{}", start.line, start.character);
            let occurrence = seen.entry(base.clone()).or_insert(0);
            let key = if *occurrence == 0 {
                base
            } else {
                format!("{base}:{occurrence}")
            };
            *occurrence += 1;
            KeyedMessage { key, diagnostic }
        })
        .collect()
}
