use serde::{Deserialize, Serialize};

use orgdir_auth::Role;

/// A role group. Every user is linked to the group of their role at creation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn for_role(role: Role) -> Self {
        Self::new(role.group_name())
    }

    /// The groups every fresh store is seeded with, one per role.
    pub fn defaults() -> Vec<Group> {
        Role::ALL.iter().copied().map(Group::for_role).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_default_group_per_role() {
        let names: Vec<String> = Group::defaults().into_iter().map(|g| g.name).collect();
        assert_eq!(names, ["Administrator", "Viewer", "User"]);
    }
}
