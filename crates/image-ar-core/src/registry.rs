use std::collections::BTreeMap;
use std::fmt;

/// Stable identifier handed out on registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId(u64);

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor#{}", self.0)
    }
}

/// Anchors interested in tracking results, grouped by target index.
///
/// Several anchors may share a target index; they are visited in
/// registration order. The registry holds handles, not the scene nodes
/// themselves.
#[derive(Clone, Debug)]
pub struct AnchorRegistry<H> {
    next_id: u64,
    by_target: BTreeMap<usize, Vec<(AnchorId, H)>>,
}

impl<H> Default for AnchorRegistry<H> {
    fn default() -> Self {
        Self {
            next_id: 0,
            by_target: BTreeMap::new(),
        }
    }
}

impl<H> AnchorRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, target_index: usize, handle: H) -> AnchorId {
        let id = AnchorId(self.next_id);
        self.next_id += 1;
        self.by_target
            .entry(target_index)
            .or_default()
            .push((id, handle));
        id
    }

    /// Remove an anchor, returning its target index and handle.
    pub fn remove(&mut self, id: AnchorId) -> Option<(usize, H)> {
        let (target_index, pos) = self.by_target.iter().find_map(|(&target, entries)| {
            entries
                .iter()
                .position(|(entry_id, _)| *entry_id == id)
                .map(|pos| (target, pos))
        })?;

        let entries = self.by_target.get_mut(&target_index)?;
        let (_, handle) = entries.remove(pos);
        if entries.is_empty() {
            self.by_target.remove(&target_index);
        }
        Some((target_index, handle))
    }

    /// Handles registered for `target_index`, in registration order.
    pub fn for_target(&self, target_index: usize) -> impl Iterator<Item = &H> {
        self.by_target
            .get(&target_index)
            .into_iter()
            .flat_map(|entries| entries.iter().map(|(_, h)| h))
    }

    /// All registrations as `(target_index, id, handle)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, AnchorId, &H)> {
        self.by_target
            .iter()
            .flat_map(|(&target, entries)| entries.iter().map(move |(id, h)| (target, *id, h)))
    }

    pub fn get(&self, id: AnchorId) -> Option<(usize, &H)> {
        self.iter()
            .find(|(_, entry_id, _)| *entry_id == id)
            .map(|(target, _, h)| (target, h))
    }

    pub fn len(&self) -> usize {
        self.by_target.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }
}
