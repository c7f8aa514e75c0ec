//! Static allow-list for administrative operations.

use std::collections::BTreeSet;

use super::ChatUserId;

/// Chat users permitted to run administrative operations such as resets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList {
    admins: BTreeSet<ChatUserId>,
}

impl AdminAllowList {
    /// Build an allow-list from explicit ids.
    ///
    /// # Examples
    /// ```
    /// use santa_backend::domain::{AdminAllowList, ChatUserId};
    ///
    /// let admins = AdminAllowList::new([101, 202].map(ChatUserId::new));
    /// assert!(admins.permits(ChatUserId::new(202)));
    /// assert!(!admins.permits(ChatUserId::new(303)));
    /// ```
    pub fn new(admins: impl IntoIterator<Item = ChatUserId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    /// True when `user` may run administrative operations.
    pub fn permits(&self, user: ChatUserId) -> bool {
        self.admins.contains(&user)
    }

    /// True when no administrator is configured.
    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}
