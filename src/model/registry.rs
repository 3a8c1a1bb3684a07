//! Which windows belong to which mosaic group.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::common::collections::HashSet;
use crate::sys::window_server::WindowHandle;

static NUMERIC_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9][0-9]*$").expect("static regex is valid"));

/// Identifies a group. `None` is the always-present group of windows that
/// were created without one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupId {
    #[default]
    None,
    Number(u32),
    Name(String),
}

impl GroupId {
    pub fn is_none(&self) -> bool { matches!(self, GroupId::None) }

    /// Rejects ids that collide with command keywords or with the numeric
    /// form of another id.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            GroupId::None => Ok(()),
            GroupId::Number(0) => Err("group numbers start at 1".to_string()),
            GroupId::Number(_) => Ok(()),
            GroupId::Name(name) if name.is_empty() => Err("group name is empty".to_string()),
            GroupId::Name(name) if name.eq_ignore_ascii_case("all") => {
                Err("\"all\" is reserved".to_string())
            }
            GroupId::Name(name) if NUMERIC_NAME.is_match(name) => {
                Err(format!("\"{name}\" would be confused with group number {name}"))
            }
            GroupId::Name(_) => Ok(()),
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupId::None => write!(f, "none"),
            GroupId::Number(n) => write!(f, "{n}"),
            GroupId::Name(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for GroupId {
    type Err = std::convert::Infallible;

    /// `""`/`"none"` map to the ungrouped group and decimal text to a
    /// number; everything else is a name, which may still fail
    /// [`GroupId::validate`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(GroupId::None);
        }
        Ok(match s.parse::<u32>() {
            Ok(n) => GroupId::Number(n),
            Err(_) => GroupId::Name(s.to_string()),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WindowEntry {
    pub handle: WindowHandle,
    /// 1-based monitor number, 0 when the window may go anywhere.
    pub pinned_monitor: u32,
    #[serde(default)]
    pub title: Option<String>,
}

impl WindowEntry {
    pub fn new(handle: WindowHandle, pinned_monitor: u32) -> Self {
        WindowEntry { handle, pinned_monitor, title: None }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GroupEntry {
    pub id: GroupId,
    pub members: Vec<WindowEntry>,
}

impl GroupEntry {
    fn new(id: GroupId) -> Self { GroupEntry { id, members: Vec::new() } }

    pub fn handles(&self) -> impl Iterator<Item = WindowHandle> + '_ {
        self.members.iter().map(|m| m.handle)
    }
}

/// Plain copy of the registry as written to the backup store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RegistrySnapshot {
    pub groups: Vec<GroupEntry>,
}

/// A window taken out of the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Removed {
    pub group: GroupId,
    pub entry: WindowEntry,
    /// The group became empty and was dropped.
    pub group_removed: bool,
}

/// Ordered groups; index 0 is always the `None` group.
///
/// Named and numbered groups are unique and never empty, and a window
/// belongs to at most one group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRegistry {
    groups: Vec<GroupEntry>,
}

impl Default for GroupRegistry {
    fn default() -> Self { Self::new() }
}

impl GroupRegistry {
    pub fn new() -> Self {
        GroupRegistry { groups: vec![GroupEntry::new(GroupId::None)] }
    }

    pub fn groups(&self) -> &[GroupEntry] { &self.groups }

    pub fn position(&self, id: &GroupId) -> Option<usize> {
        self.groups.iter().position(|g| &g.id == id)
    }

    pub fn group(&self, id: &GroupId) -> Option<&GroupEntry> {
        self.groups.iter().find(|g| &g.id == id)
    }

    pub fn members(&self, id: &GroupId) -> &[WindowEntry] {
        self.group(id).map(|g| g.members.as_slice()).unwrap_or(&[])
    }

    pub fn group_of(&self, handle: WindowHandle) -> Option<&GroupId> {
        self.groups.iter().find(|g| g.handles().any(|h| h == handle)).map(|g| &g.id)
    }

    pub fn window_count(&self) -> usize { self.groups.iter().map(|g| g.members.len()).sum() }

    pub fn is_empty(&self) -> bool { self.window_count() == 0 }

    /// Returns the group's index and whether it had to be created.
    pub fn ensure_group(&mut self, id: &GroupId) -> (usize, bool) {
        match self.position(id) {
            Some(idx) => (idx, false),
            None => {
                self.groups.push(GroupEntry::new(id.clone()));
                (self.groups.len() - 1, true)
            }
        }
    }

    /// Appends a window to a group, creating the group if needed. Returns
    /// whether the group is new.
    pub fn add_window(&mut self, id: &GroupId, entry: WindowEntry) -> bool {
        if let Some(previous) = self.remove_window(entry.handle) {
            warn!(handle = %entry.handle, from = %previous.group, to = %id, "Window moved between groups");
        }
        let (idx, created) = self.ensure_group(id);
        self.groups[idx].members.push(entry);
        created
    }

    pub fn remove_window(&mut self, handle: WindowHandle) -> Option<Removed> {
        let (idx, pos) = self.groups.iter().enumerate().find_map(|(idx, g)| {
            g.members.iter().position(|m| m.handle == handle).map(|pos| (idx, pos))
        })?;
        let entry = self.groups[idx].members.remove(pos);
        let group = self.groups[idx].id.clone();
        let group_removed = idx > 0 && self.groups[idx].members.is_empty();
        if group_removed {
            self.groups.remove(idx);
            debug!(%group, "Group emptied and removed");
        }
        Some(Removed { group, entry, group_removed })
    }

    /// Drops a whole group and returns its members. The `None` group is
    /// emptied but stays in place.
    pub fn remove_group(&mut self, id: &GroupId) -> Option<Vec<WindowEntry>> {
        let idx = self.position(id)?;
        if idx == 0 {
            return Some(std::mem::take(&mut self.groups[0].members));
        }
        Some(self.groups.remove(idx).members)
    }

    /// Empties the registry, returning every window it held.
    pub fn clear(&mut self) -> Vec<WindowEntry> {
        let all = self.groups.drain(..).flat_map(|g| g.members).collect();
        self.groups.push(GroupEntry::new(GroupId::None));
        all
    }

    pub fn snapshot(&self) -> RegistrySnapshot { RegistrySnapshot { groups: self.groups.clone() } }

    /// Rebuilds a registry from a snapshot, repairing anything that breaks
    /// the invariants: a missing `None` group, duplicate group ids, empty
    /// groups, and windows listed more than once.
    pub fn restore(snapshot: RegistrySnapshot) -> Self {
        let mut registry = GroupRegistry::new();
        let mut seen: HashSet<WindowHandle> = HashSet::default();
        for group in snapshot.groups {
            if let Err(reason) = group.id.validate() {
                warn!(group = %group.id, "Dropping invalid group from backup: {reason}");
                continue;
            }
            let (idx, _) = registry.ensure_group(&group.id);
            for member in group.members {
                if seen.insert(member.handle) {
                    registry.groups[idx].members.push(member);
                } else {
                    warn!(handle = %member.handle, "Window listed twice in backup");
                }
            }
        }
        registry.groups.retain(|g| g.id.is_none() || !g.members.is_empty());
        registry
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn h(id: u64) -> WindowHandle { WindowHandle::new(id) }

    fn name(s: &str) -> GroupId { GroupId::Name(s.to_string()) }

    #[test]
    fn new_registry_has_only_the_none_group() {
        let registry = GroupRegistry::new();
        assert_eq!(registry.groups().len(), 1);
        assert_eq!(registry.groups()[0].id, GroupId::None);
        assert!(registry.is_empty());
    }

    #[test]
    fn group_id_parsing() {
        assert_eq!("".parse::<GroupId>().unwrap(), GroupId::None);
        assert_eq!("none".parse::<GroupId>().unwrap(), GroupId::None);
        assert_eq!("12".parse::<GroupId>().unwrap(), GroupId::Number(12));
        assert_eq!("plots".parse::<GroupId>().unwrap(), name("plots"));
    }

    #[test]
    fn reserved_and_numeric_names_are_invalid() {
        assert!(name("all").validate().is_err());
        assert!(name("ALL").validate().is_err());
        assert!(name("42").validate().is_err());
        assert!(name("").validate().is_err());
        assert!(GroupId::Number(0).validate().is_err());

        assert!(name("042").validate().is_ok());
        assert!(name("plots").validate().is_ok());
        assert!(GroupId::Number(3).validate().is_ok());
        assert!(GroupId::None.validate().is_ok());
    }

    #[test]
    fn adding_windows_creates_groups_once() {
        let mut registry = GroupRegistry::new();
        assert!(registry.add_window(&name("g"), WindowEntry::new(h(1), 0)));
        assert!(!registry.add_window(&name("g"), WindowEntry::new(h(2), 1)));
        assert!(!registry.add_window(&GroupId::None, WindowEntry::new(h(3), 0)));

        assert_eq!(registry.groups().len(), 2);
        assert_eq!(registry.members(&name("g")).len(), 2);
        assert_eq!(registry.group_of(h(2)), Some(&name("g")));
        assert_eq!(registry.group_of(h(3)), Some(&GroupId::None));
        assert_eq!(registry.group_of(h(4)), None);
    }

    #[test]
    fn re_adding_a_window_moves_it() {
        let mut registry = GroupRegistry::new();
        registry.add_window(&name("a"), WindowEntry::new(h(1), 0));
        registry.add_window(&name("b"), WindowEntry::new(h(1), 0));
        assert_eq!(registry.group(&name("a")), None);
        assert_eq!(registry.group_of(h(1)), Some(&name("b")));
        assert_eq!(registry.window_count(), 1);
    }

    #[test]
    fn removing_last_member_drops_named_group_but_not_none() {
        let mut registry = GroupRegistry::new();
        registry.add_window(&name("g"), WindowEntry::new(h(1), 0));
        registry.add_window(&GroupId::None, WindowEntry::new(h(2), 0));

        let removed = registry.remove_window(h(1)).unwrap();
        assert!(removed.group_removed);
        assert_eq!(registry.group(&name("g")), None);

        let removed = registry.remove_window(h(2)).unwrap();
        assert!(!removed.group_removed);
        assert_eq!(registry.groups().len(), 1);
        assert!(registry.remove_window(h(2)).is_none());
    }

    #[test]
    fn remove_group_and_clear() {
        let mut registry = GroupRegistry::new();
        registry.add_window(&GroupId::Number(1), WindowEntry::new(h(1), 0));
        registry.add_window(&GroupId::Number(1), WindowEntry::new(h(2), 0));
        registry.add_window(&GroupId::None, WindowEntry::new(h(3), 0));

        let members = registry.remove_group(&GroupId::Number(1)).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(registry.remove_group(&GroupId::Number(1)), None);

        let members = registry.remove_group(&GroupId::None).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(registry.groups().len(), 1);

        registry.add_window(&name("x"), WindowEntry::new(h(4), 0));
        assert_eq!(registry.clear().len(), 1);
        assert_eq!(registry, GroupRegistry::new());
    }

    #[test]
    fn snapshot_round_trips_through_ron() {
        let mut registry = GroupRegistry::new();
        registry.add_window(&GroupId::None, WindowEntry::new(h(7), 0));
        registry.add_window(&name("g"), WindowEntry::new(h(1), 2).with_title(Some("a".into())));
        registry.add_window(&GroupId::Number(3), WindowEntry::new(h(2), 0));

        let text = ron::ser::to_string(&registry.snapshot()).unwrap();
        let snapshot: RegistrySnapshot = ron::from_str(&text).unwrap();
        assert_eq!(GroupRegistry::restore(snapshot), registry);
    }

    #[test]
    fn restore_repairs_broken_snapshots() {
        let snapshot = RegistrySnapshot {
            groups: vec![
                GroupEntry { id: name("g"), members: vec![WindowEntry::new(h(1), 0)] },
                GroupEntry { id: name("empty"), members: vec![] },
                GroupEntry { id: name("all"), members: vec![WindowEntry::new(h(9), 0)] },
                GroupEntry {
                    id: name("g"),
                    members: vec![WindowEntry::new(h(2), 0), WindowEntry::new(h(1), 0)],
                },
            ],
        };
        let registry = GroupRegistry::restore(snapshot);

        assert_eq!(registry.groups()[0].id, GroupId::None);
        assert_eq!(registry.groups().len(), 2);
        let handles: Vec<_> = registry.group(&name("g")).unwrap().handles().collect();
        assert_eq!(handles, vec![h(1), h(2)]);
        assert_eq!(registry.group_of(h(9)), None);
    }
}
