//! Channel state as tracked by the client.

use super::user::{User, strip_sigils};

/// A channel the client occupies and its known members.
///
/// Member order carries no meaning. NAMES replies arrive in batches closed
/// by end-of-names; the first reply of a batch replaces the member set and
/// the rest extend it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    members: Vec<User>,
    names_in_progress: bool,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            names_in_progress: false,
        }
    }

    /// Create a channel populated from a space-separated NAMES list.
    pub fn with_names(name: impl Into<String>, names: &str) -> Self {
        let mut channel = Self::new(name);
        channel.apply_names(names);
        channel
    }

    pub fn members(&self) -> &[User] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, nickname: &str) -> bool {
        self.user(nickname).is_some()
    }

    pub fn user(&self, nickname: &str) -> Option<&User> {
        self.members.iter().find(|u| u.is(nickname))
    }

    pub fn user_mut(&mut self, nickname: &str) -> Option<&mut User> {
        self.members.iter_mut().find(|u| u.is(nickname))
    }

    /// Look up a member, creating it when first observed.
    pub fn ensure_user(&mut self, nickname: &str) -> &mut User {
        match self.members.iter().position(|u| u.is(nickname)) {
            Some(idx) => &mut self.members[idx],
            None => {
                self.members.push(User::new(nickname, self.name.clone()));
                let last = self.members.len() - 1;
                &mut self.members[last]
            }
        }
    }

    pub fn remove_user(&mut self, nickname: &str) -> Option<User> {
        let idx = self.members.iter().position(|u| u.is(nickname))?;
        Some(self.members.swap_remove(idx))
    }

    /// Apply one NAMES reply.
    ///
    /// Members already known keep their synchronized metadata when a batch
    /// replaces the set.
    pub fn apply_names(&mut self, names: &str) {
        let nicks = names.split_whitespace().map(strip_sigils).filter(|n| !n.is_empty());

        if self.names_in_progress {
            for nick in nicks {
                self.ensure_user(nick);
            }
            return;
        }

        let mut previous = std::mem::take(&mut self.members);
        for nick in nicks {
            if self.contains(nick) {
                continue;
            }
            let user = match previous.iter().position(|u| u.is(nick)) {
                Some(idx) => previous.swap_remove(idx),
                None => User::new(nick, self.name.clone()),
            };
            self.members.push(user);
        }
        self.names_in_progress = true;
    }

    /// Close the current NAMES batch.
    pub fn end_names(&mut self) {
        self.names_in_progress = false;
    }
}
