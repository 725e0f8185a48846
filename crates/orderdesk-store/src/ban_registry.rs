//! Set of users forbidden from creating orders.
//!
//! The registry is a plain set and knows nothing about operators or orders.
//! Protecting operators and force-cancelling a banned user's order is the
//! lifecycle engine's job.

use std::collections::BTreeSet;

use orderdesk_types::UserId;

/// Set of banned user identifiers, iterated in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BanRegistry {
    banned: BTreeSet<UserId>,
}

impl BanRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `user`. Returns `false` if the user was already banned; banning
    /// twice is not an error at this level.
    pub fn ban(&mut self, user: UserId) -> bool {
        self.banned.insert(user)
    }

    /// Remove `user`. Returns `false` if the user was not banned.
    pub fn unban(&mut self, user: UserId) -> bool {
        self.banned.remove(&user)
    }

    #[must_use]
    pub fn is_banned(&self, user: UserId) -> bool {
        self.banned.contains(&user)
    }

    #[must_use]
    pub fn list(&self) -> Vec<UserId> {
        self.banned.iter().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.banned.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.banned.is_empty()
    }
}

impl FromIterator<UserId> for BanRegistry {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        Self {
            banned: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ban_and_check() {
        let mut reg = BanRegistry::new();
        assert!(reg.ban(UserId(5)));
        assert!(reg.is_banned(UserId(5)));
        assert!(!reg.is_banned(UserId(6)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn double_ban_is_idempotent() {
        let mut reg = BanRegistry::new();
        assert!(reg.ban(UserId(5)));
        assert!(!reg.ban(UserId(5)), "second ban reports no change");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unban_reports_membership() {
        let mut reg = BanRegistry::new();
        reg.ban(UserId(5));
        assert!(reg.unban(UserId(5)));
        assert!(!reg.unban(UserId(5)));
        assert!(reg.is_empty());
    }

    #[test]
    fn list_is_sorted() {
        let reg: BanRegistry = [UserId(30), UserId(10), UserId(20)].into_iter().collect();
        assert_eq!(reg.list(), vec![UserId(10), UserId(20), UserId(30)]);
    }
}
