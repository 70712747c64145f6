//! Authorization checks for voice commands.

use yukino_types::{AllowList, RoleId, UserId};

/// The command invoker as seen by the platform: who they are and what the
/// platform already knows about their privileges.
#[derive(Debug, Clone, Default)]
pub struct Invoker {
    pub user_id: UserId,
    /// Guild-level administrator permission, resolved by the platform.
    pub is_admin: bool,
    pub roles: Vec<RoleId>,
}

/// The bot operator and guild administrators bypass the allow-list.
pub fn is_owner_or_admin(invoker: &Invoker, owner_id: UserId) -> bool {
    invoker.user_id == owner_id || invoker.is_admin
}

/// Whether the invoker may operate voice commands: operator/administrator,
/// explicitly allowed user, or member of an allowed role.
pub fn can_use_vc(invoker: &Invoker, owner_id: UserId, allow: &AllowList) -> bool {
    if is_owner_or_admin(invoker, owner_id) {
        return true;
    }
    if allow.contains_user(invoker.user_id) {
        return true;
    }
    allow.intersects_roles(&invoker.roles)
}
