use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The operating mode of a queue server, fetched once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Mode {
    /// Anyone can add, skip, and delete. No voting, no accounts.
    Simple,
    /// Like [Mode::Simple], but songs can be voted on.
    Voting,
    /// Accounts are required, moderators control skipping and deleting.
    UserVoting,
    /// Like [Mode::UserVoting], but submitting and voting costs coins.
    UserCoin,
}

/// The authorization tier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

/// A mutating operation that is subject to a capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Submit,
    Skip,
    Delete,
    Vote,
    ManageCoins,
    Administer,
}

/// What a (mode, role) pair is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet {
    pub can_see_identity: bool,
    pub can_vote: bool,
    /// Skip and delete
    pub can_moderate: bool,
    pub can_manage_coins: bool,
    pub can_admin: bool,
}

/// Deployment knobs for the capability policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Whether skip and delete are open to everyone in the anonymous modes.
    pub anonymous_moderation: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{kind} value {value} is out of range")]
pub struct OutOfRange {
    kind: &'static str,
    value: u8,
}

impl Mode {
    /// Returns true if the mode requires accounts.
    pub fn has_accounts(&self) -> bool {
        matches!(self, Self::UserVoting | Self::UserCoin)
    }
}

impl Role {
    pub fn is_moderator(&self) -> bool {
        *self >= Role::Moderator
    }

    pub fn is_admin(&self) -> bool {
        *self >= Role::Admin
    }
}

impl CapabilitySet {
    /// Returns true if the given action is allowed.
    ///
    /// Submitting is always allowed locally, the server enforces authentication for it.
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Submit => true,
            Action::Skip | Action::Delete => self.can_moderate,
            Action::Vote => self.can_vote,
            Action::ManageCoins => self.can_manage_coins,
            Action::Administer => self.can_admin,
        }
    }
}

impl Policy {
    /// Resolves the capabilities of a role in a mode.
    pub fn capabilities(&self, mode: Mode, role: Role) -> CapabilitySet {
        match mode {
            Mode::Simple | Mode::Voting => CapabilitySet {
                can_see_identity: false,
                can_vote: mode == Mode::Voting,
                can_moderate: self.anonymous_moderation || role.is_moderator(),
                can_manage_coins: false,
                can_admin: false,
            },
            Mode::UserVoting | Mode::UserCoin => CapabilitySet {
                can_see_identity: true,
                can_vote: true,
                can_moderate: role.is_moderator(),
                can_manage_coins: mode == Mode::UserCoin && role.is_moderator(),
                can_admin: role.is_admin(),
            },
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            anonymous_moderation: true,
        }
    }
}

/// Resolves the capabilities of a role in a mode with the default [Policy].
pub fn capabilities(mode: Mode, role: Role) -> CapabilitySet {
    Policy::default().capabilities(mode, role)
}

impl TryFrom<u8> for Mode {
    type Error = OutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Simple),
            1 => Ok(Self::Voting),
            2 => Ok(Self::UserVoting),
            3 => Ok(Self::UserCoin),
            value => Err(OutOfRange { kind: "mode", value }),
        }
    }
}

impl From<Mode> for u8 {
    fn from(value: Mode) -> Self {
        match value {
            Mode::Simple => 0,
            Mode::Voting => 1,
            Mode::UserVoting => 2,
            Mode::UserCoin => 3,
        }
    }
}

impl TryFrom<u8> for Role {
    type Error = OutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::User),
            1 => Ok(Self::Moderator),
            2 => Ok(Self::Admin),
            value => Err(OutOfRange { kind: "role", value }),
        }
    }
}

impl From<Role> for u8 {
    fn from(value: Role) -> Self {
        match value {
            Role::User => 0,
            Role::Moderator => 1,
            Role::Admin => 2,
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mode::Simple => "simple",
            Mode::Voting => "voting",
            Mode::UserVoting => "user voting",
            Mode::UserCoin => "user coin",
        };

        f.write_str(name)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        };

        f.write_str(name)
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::Submit => "submit",
            Action::Skip => "skip",
            Action::Delete => "delete",
            Action::Vote => "vote",
            Action::ManageCoins => "manage coins",
            Action::Administer => "administer",
        };

        f.write_str(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MODES: [Mode; 4] = [Mode::Simple, Mode::Voting, Mode::UserVoting, Mode::UserCoin];
    const ROLES: [Role; 3] = [Role::User, Role::Moderator, Role::Admin];

    #[test]
    fn test_voting_by_mode() {
        for role in ROLES {
            assert!(!capabilities(Mode::Simple, role).can_vote);
            assert!(capabilities(Mode::Voting, role).can_vote);
            assert!(capabilities(Mode::UserVoting, role).can_vote);
            assert!(capabilities(Mode::UserCoin, role).can_vote);
        }
    }

    #[test]
    fn test_anonymous_modes() {
        for mode in [Mode::Simple, Mode::Voting] {
            for role in ROLES {
                let caps = capabilities(mode, role);

                assert!(!caps.can_see_identity, "{mode} hides identity");
                assert!(caps.can_moderate, "{mode} lets {role} moderate");
                assert!(!caps.can_manage_coins);
                assert!(!caps.can_admin);
            }
        }
    }

    #[test]
    fn test_user_modes() {
        for mode in [Mode::UserVoting, Mode::UserCoin] {
            assert!(capabilities(mode, Role::User).can_see_identity);
            assert!(!capabilities(mode, Role::User).can_moderate);
            assert!(capabilities(mode, Role::Moderator).can_moderate);
            assert!(capabilities(mode, Role::Admin).can_moderate);

            assert!(!capabilities(mode, Role::Moderator).can_admin);
            assert!(capabilities(mode, Role::Admin).can_admin);
        }

        assert!(!capabilities(Mode::UserCoin, Role::User).can_manage_coins);
        assert!(capabilities(Mode::UserCoin, Role::Moderator).can_manage_coins);
        assert!(capabilities(Mode::UserCoin, Role::Admin).can_manage_coins);
        assert!(!capabilities(Mode::UserVoting, Role::Admin).can_manage_coins);
    }

    #[test]
    fn test_policy_is_total_and_pure() {
        for mode in MODES {
            for role in ROLES {
                assert_eq!(capabilities(mode, role), capabilities(mode, role));
            }
        }
    }

    #[test]
    fn test_strict_anonymous_moderation() {
        let policy = Policy {
            anonymous_moderation: false,
        };

        assert!(!policy.capabilities(Mode::Simple, Role::User).can_moderate);
        assert!(policy.capabilities(Mode::Voting, Role::Moderator).can_moderate);
    }

    #[test]
    fn test_allows() {
        let caps = capabilities(Mode::UserVoting, Role::User);

        assert!(caps.allows(Action::Submit));
        assert!(caps.allows(Action::Vote));
        assert!(!caps.allows(Action::Skip));
        assert!(!caps.allows(Action::Delete));
        assert!(!caps.allows(Action::ManageCoins));
        assert!(!caps.allows(Action::Administer));
    }

    #[test]
    fn test_wire_values() {
        let mode: Mode = serde_json::from_str("3").unwrap();
        let role: Role = serde_json::from_str("1").unwrap();

        assert_eq!(mode, Mode::UserCoin);
        assert_eq!(role, Role::Moderator);
        assert!(serde_json::from_str::<Mode>("4").is_err());
    }
}
