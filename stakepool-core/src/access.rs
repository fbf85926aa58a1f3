use crate::error::{EscrowError, Result};
use crate::types::Identity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Owner plus admin set. The owner is always an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Identity,
    admins: BTreeSet<Identity>,
}

impl AccessControl {
    pub fn new(owner: Identity) -> Self {
        let mut admins = BTreeSet::new();
        admins.insert(owner.clone());
        Self { owner, admins }
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn admins(&self) -> impl Iterator<Item = &Identity> {
        self.admins.iter()
    }

    pub fn is_owner(&self, actor: &Identity) -> bool {
        &self.owner == actor
    }

    pub fn is_privileged(&self, actor: &Identity) -> bool {
        self.admins.contains(actor)
    }

    pub fn ensure_privileged(&self, actor: &Identity, action: &str) -> Result<()> {
        if !self.is_privileged(actor) {
            return Err(EscrowError::unauthorized(format!(
                "only an admin can {}",
                action
            )));
        }
        Ok(())
    }

    pub fn ensure_owner(&self, actor: &Identity, action: &str) -> Result<()> {
        if !self.is_owner(actor) {
            return Err(EscrowError::unauthorized(format!(
                "only the owner can {}",
                action
            )));
        }
        Ok(())
    }

    /// Idempotent.
    pub fn add_admin(&mut self, caller: &Identity, candidate: Identity) -> Result<()> {
        self.ensure_owner(caller, "add an admin")?;
        self.admins.insert(candidate);
        Ok(())
    }

    pub fn remove_admin(&mut self, caller: &Identity, target: &Identity) -> Result<()> {
        self.ensure_owner(caller, "remove an admin")?;
        if self.is_owner(target) {
            return Err(EscrowError::invalid_operation(
                "owner cannot be removed as admin",
            ));
        }
        self.admins.remove(target);
        Ok(())
    }

    /// The previous owner loses admin rights unless re-added by the new owner.
    pub fn transfer_ownership(&mut self, caller: &Identity, new_owner: Identity) -> Result<()> {
        self.ensure_owner(caller, "transfer ownership")?;
        self.admins.remove(caller);
        self.admins.insert(new_owner.clone());
        self.owner = new_owner;
        Ok(())
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.admins.contains(&self.owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identity {
        Identity::new(s)
    }

    #[test]
    fn test_owner_is_admin() {
        let acl = AccessControl::new(id("owner"));
        assert!(acl.is_privileged(&id("owner")));
        assert!(!acl.is_privileged(&id("alice")));
    }

    #[test]
    fn test_add_and_remove_admin() {
        let mut acl = AccessControl::new(id("owner"));
        acl.add_admin(&id("owner"), id("admin1")).unwrap();
        acl.add_admin(&id("owner"), id("admin1")).unwrap();
        assert_eq!(acl.admins().count(), 2);

        acl.remove_admin(&id("owner"), &id("admin1")).unwrap();
        assert!(!acl.is_privileged(&id("admin1")));
    }

    #[test]
    fn test_only_owner_manages_admins() {
        let mut acl = AccessControl::new(id("owner"));
        acl.add_admin(&id("owner"), id("admin1")).unwrap();

        let result = acl.add_admin(&id("admin1"), id("mallory"));
        assert!(matches!(result, Err(EscrowError::Unauthorized(_))));

        let result = acl.remove_admin(&id("admin1"), &id("owner"));
        assert!(matches!(result, Err(EscrowError::Unauthorized(_))));
    }

    #[test]
    fn test_owner_cannot_be_removed() {
        let mut acl = AccessControl::new(id("owner"));
        let result = acl.remove_admin(&id("owner"), &id("owner"));
        assert!(matches!(result, Err(EscrowError::InvalidOperation(_))));
        assert!(acl.is_privileged(&id("owner")));
    }

    #[test]
    fn test_transfer_ownership_drops_old_owner() {
        let mut acl = AccessControl::new(id("owner"));
        acl.transfer_ownership(&id("owner"), id("admin1")).unwrap();

        assert_eq!(acl.owner(), &id("admin1"));
        assert!(acl.is_privileged(&id("admin1")));
        assert!(!acl.is_privileged(&id("owner")));
        assert!(acl.is_consistent());

        let result = acl.transfer_ownership(&id("owner"), id("owner"));
        assert!(matches!(result, Err(EscrowError::Unauthorized(_))));
    }

    #[test]
    fn test_transfer_ownership_to_self() {
        let mut acl = AccessControl::new(id("owner"));
        acl.transfer_ownership(&id("owner"), id("owner")).unwrap();
        assert!(acl.is_privileged(&id("owner")));
        assert!(acl.is_consistent());
    }
}
