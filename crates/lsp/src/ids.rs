use std::fmt;

/// Identifies one language server process instance. `slot` is the index in
/// the registry's live-server table; `generation` increments every time
/// that slot is respawned, so a stale handle to a since-restarted server
/// compares unequal to the new one even though it occupies the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LanguageServerId {
    slot: u32,
    generation: u32,
}

impl LanguageServerId {
    pub fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for LanguageServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server#{}.{}", self.slot, self.generation)
    }
}
