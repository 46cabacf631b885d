//! Startup-time allocation of global indices.

use trackd_config::IndexRef;
use trackd_errors::{ConfigError, ConfigResult};
use trackd_types::IndexKind;

use crate::DeviceId;

/// One allocated slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub owner: DeviceId,
    pub owner_name: String,
    pub name: String,
    /// Index within the owning device.
    pub local_index: usize,
}

/// One global namespace. Slots are allocated sequentially or claimed at an
/// explicit index; unclaimed indices below the highest claim are holes.
#[derive(Debug, Clone)]
pub struct Namespace {
    kind: IndexKind,
    slots: Vec<Option<Slot>>,
}

impl Namespace {
    pub fn new(kind: IndexKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
        }
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Next index handed out by [`Namespace::allocate`].
    pub fn next_index(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn allocate(&mut self, slot: Slot) -> usize {
        self.slots.push(Some(slot));
        self.slots.len() - 1
    }

    /// Claim `index`, growing the namespace as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IndexCollision`] if another slot owns `index`.
    pub fn claim(&mut self, index: usize, slot: Slot) -> ConfigResult<usize> {
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        match self.slots.get_mut(index) {
            Some(Some(existing)) => Err(ConfigError::IndexCollision {
                kind: self.kind.as_str(),
                index,
                owner: existing.owner_name.clone(),
                claimant: slot.owner_name,
            }),
            Some(entry) => {
                *entry = Some(slot);
                Ok(index)
            }
            None => Err(ConfigError::out_of_range(
                self.kind.as_str(),
                index,
                self.slots.len(),
                slot.owner_name,
            )),
        }
    }

    /// Unclaimed indices.
    pub fn holes(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.is_none().then_some(i))
            .collect()
    }

    /// Indices owned by `owner`.
    pub fn owned_by(&self, owner: DeviceId) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(i, s)| s.as_ref().filter(|s| s.owner == owner).map(|_| i))
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| s.name == name))
    }

    /// Resolve a configuration reference to an allocated index.
    ///
    /// # Errors
    ///
    /// Returns an error for an unallocated index or an unknown name.
    pub fn resolve(&self, reference: &IndexRef, context: &str) -> ConfigResult<usize> {
        match reference {
            IndexRef::Index(index) if self.slot(*index).is_some() => Ok(*index),
            IndexRef::Index(index) => Err(ConfigError::out_of_range(
                self.kind.as_str(),
                *index,
                self.len(),
                context,
            )),
            IndexRef::Name(name) => self.find(name).ok_or_else(|| ConfigError::UnknownName {
                kind: self.kind.as_str(),
                name: name.clone(),
                context: context.to_string(),
            }),
        }
    }

    /// Check that `index` is allocated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IndexOutOfRange`] otherwise.
    pub fn check(&self, index: usize, context: &str) -> ConfigResult<usize> {
        self.resolve(&IndexRef::Index(index), context)
    }

    pub fn names(&self) -> Vec<String> {
        self.slots
            .iter()
            .map(|s| s.as_ref().map(|s| s.name.clone()).unwrap_or_default())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(owner: usize, name: &str) -> Slot {
        Slot {
            owner: DeviceId(owner),
            owner_name: format!("dev{owner}"),
            name: name.to_string(),
            local_index: 0,
        }
    }

    #[test]
    fn test_sequential_allocation() {
        let mut ns = Namespace::new(IndexKind::Button);
        assert_eq!(ns.allocate(slot(0, "a")), 0);
        assert_eq!(ns.allocate(slot(0, "b")), 1);
        assert_eq!(ns.next_index(), 2);
        assert_eq!(ns.find("b"), Some(1));
    }

    #[test]
    fn test_claim_collision() {
        let mut ns = Namespace::new(IndexKind::Tracker);
        assert_eq!(ns.claim(3, slot(0, "head")), Ok(3));
        assert_eq!(ns.holes(), vec![0, 1, 2]);
        let err = ns.claim(3, slot(1, "wand")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "tracker index 3 claimed by 'dev1' is already owned by 'dev0'"
        );
    }

    #[test]
    fn test_resolve() {
        let mut ns = Namespace::new(IndexKind::Valuator);
        ns.allocate(slot(0, "JoyX"));
        assert_eq!(ns.resolve(&IndexRef::from("JoyX"), "Wand"), Ok(0));
        assert!(matches!(
            ns.resolve(&IndexRef::from("JoyY"), "Wand"),
            Err(ConfigError::UnknownName { .. })
        ));
        assert!(matches!(
            ns.resolve(&IndexRef::Index(4), "Wand"),
            Err(ConfigError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_owned_by() {
        let mut ns = Namespace::new(IndexKind::Tracker);
        ns.allocate(slot(0, "a"));
        ns.allocate(slot(1, "b"));
        ns.allocate(slot(0, "c"));
        assert_eq!(ns.owned_by(DeviceId(0)).collect::<Vec<_>>(), vec![0, 2]);
    }
}
