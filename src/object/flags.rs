//! Pending server flags of a player object
//!
//! Things about a player that changed since the server last sent them to
//! the player's own client.

use bitflags::bitflags;

bitflags! {
    /// Player state the server still has to send
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PendingFlags: u8 {
        /// Position was forced; the client must be moved
        const TELEPORTED = 1 << 0;
        /// Inventory contents changed
        const INVENTORY = 1 << 1;
        const HP = 1 << 2;
        const HUNGER = 1 << 3;
        const OXYGEN = 1 << 4;
        /// Wielded item changed
        const WIELDED_ITEM = 1 << 5;
    }
}

impl Default for PendingFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl PendingFlags {
    pub fn has_pending(&self) -> bool {
        !self.is_empty()
    }

    /// Clear a flag, returning whether it was set
    pub fn take(&mut self, flag: PendingFlags) -> bool {
        let was_set = self.contains(flag);
        self.remove(flag);
        was_set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take() {
        let mut flags = PendingFlags::HP | PendingFlags::OXYGEN;
        assert!(flags.has_pending());
        assert!(flags.take(PendingFlags::HP));
        assert!(!flags.take(PendingFlags::HP));
        assert_eq!(flags, PendingFlags::OXYGEN);
    }

    #[test]
    fn test_default_is_empty() {
        assert!(!PendingFlags::default().has_pending());
    }
}
