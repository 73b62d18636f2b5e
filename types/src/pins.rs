use crate::position::DocumentPosition;

/// Positions the user pinned for persistent display.
///
/// Insertion-ordered; entries only leave through [`PinSet::unpin`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinSet {
    pins: Vec<DocumentPosition>,
}

impl PinSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the position was already pinned.
    pub fn pin(&mut self, pos: DocumentPosition) -> bool {
        if self.contains(&pos) {
            return false;
        }
        self.pins.push(pos);
        true
    }

    /// Returns `false` if the position was not pinned.
    pub fn unpin(&mut self, pos: &DocumentPosition) -> bool {
        let before = self.pins.len();
        self.pins.retain(|p| p != pos);
        self.pins.len() != before
    }

    #[must_use]
    pub fn contains(&self, pos: &DocumentPosition) -> bool {
        self.pins.iter().any(|p| p == pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentPosition> {
        self.pins.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}
