//! The mosaic state machine.
//!
//! The controller owns the group registry and reacts to window creation,
//! user close requests and display changes by re-laying-out the affected
//! group. Every collaborator is injected so hosts and tests can swap them.

mod error;
#[cfg(test)]
mod testing;

pub use error::MosaicError;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::common::collections::HashMap;
use crate::common::config::Settings;
use crate::layout_engine::{LayoutEngine, Placements};
use crate::model::{BackupStore, GroupId, GroupRegistry, RegistrySnapshot, WindowEntry};
use crate::sys::prompt::{CloseAnswer, Prompt};
use crate::sys::screen::Display;
use crate::sys::window_server::{WindowHandle, WindowServer};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct CreateOptions {
    /// 1-based monitor to pin the window to, 0 for any.
    pub monitor: u32,
    pub group: GroupId,
    pub title: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CloseTarget {
    All,
    Group(GroupId),
}

/// What a user close request ended up doing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CloseOutcome {
    /// The window was not in any group and was destroyed outright.
    Unknown(WindowHandle),
    Cancelled { group: GroupId },
    Closed {
        group: GroupId,
        windows: Vec<WindowHandle>,
        group_removed: bool,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MosaicCommand {
    Create(CreateOptions),
    Close(CloseTarget),
    Layout(GroupId),
    LayoutAll,
    ListGroups,
    DebugState,
    SetBatchClose(bool),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    CloseRequested(WindowHandle),
    DisplaysChanged,
    Command(MosaicCommand),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Created(WindowHandle),
    CloseOutcome(CloseOutcome),
    Destroyed(Vec<WindowHandle>),
    Placements(Placements),
    Groups(Vec<(GroupId, usize)>),
    State(RegistrySnapshot),
    Done,
}

pub struct MosaicController<W, D, B, P> {
    server: W,
    display: D,
    backup: B,
    prompt: P,
    engine: LayoutEngine,
    settings: Settings,
    /// `None` until first use, and again after the in-memory copy is lost.
    registry: Option<GroupRegistry>,
    /// Windows whose close requests are routed here, with the group they
    /// were created in.
    close_handlers: HashMap<WindowHandle, GroupId>,
    batch_close: bool,
}

impl<W, D, B, P> MosaicController<W, D, B, P>
where
    W: WindowServer,
    D: Display,
    B: BackupStore,
    P: Prompt,
{
    pub fn new(settings: Settings, server: W, display: D, backup: B, prompt: P) -> Self {
        MosaicController {
            server,
            display,
            backup,
            prompt,
            engine: LayoutEngine::from_settings(&settings),
            settings,
            registry: None,
            close_handlers: HashMap::default(),
            batch_close: false,
        }
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    pub fn engine(&self) -> &LayoutEngine { &self.engine }

    pub fn server(&self) -> &W { &self.server }

    pub fn server_mut(&mut self) -> &mut W { &mut self.server }

    pub fn display(&self) -> &D { &self.display }

    pub fn display_mut(&mut self) -> &mut D { &mut self.display }

    pub fn backup(&self) -> &B { &self.backup }

    pub fn prompt(&self) -> &P { &self.prompt }

    pub fn prompt_mut(&mut self) -> &mut P { &mut self.prompt }

    /// While set, closing a window of a group never prompts and only closes
    /// that window. Hosts set it around closing many windows at once.
    pub fn set_batch_close(&mut self, batch: bool) {
        debug!(batch, "Batch close flag changed");
        self.batch_close = batch;
    }

    pub fn batch_close(&self) -> bool { self.batch_close }

    pub fn is_intercepted(&self, handle: WindowHandle) -> bool {
        self.close_handlers.contains_key(&handle)
    }

    /// Drops the in-memory registry. The next access restores it from the
    /// backup store.
    pub fn forget_registry(&mut self) {
        warn!("Registry dropped from memory");
        self.registry = None;
    }

    pub fn is_registry_loaded(&self) -> bool { self.registry.is_some() }

    fn registry(&mut self) -> &mut GroupRegistry {
        if self.registry.is_none() {
            let registry = self.load_registry();
            for group in registry.groups() {
                for handle in group.handles() {
                    self.close_handlers.entry(handle).or_insert_with(|| group.id.clone());
                }
            }
            self.registry = Some(registry);
        }
        self.registry.get_or_insert_with(GroupRegistry::new)
    }

    fn load_registry(&self) -> GroupRegistry {
        match self.backup.load(&self.settings.backup_key) {
            Ok(Some(snapshot)) => {
                let registry = GroupRegistry::restore(snapshot);
                info!(
                    groups = registry.groups().len(),
                    windows = registry.window_count(),
                    "Registry restored from backup"
                );
                registry
            }
            Ok(None) => GroupRegistry::new(),
            Err(e) => {
                warn!("Could not load registry backup, starting empty: {e}");
                GroupRegistry::new()
            }
        }
    }

    fn persist(&mut self) {
        let Some(registry) = &self.registry else { return };
        let snapshot = registry.snapshot();
        if let Err(e) = self.backup.save(&self.settings.backup_key, &snapshot) {
            error!("Could not save registry: {e}");
        }
    }

    fn destroy(&mut self, handle: WindowHandle) {
        self.close_handlers.remove(&handle);
        self.server.destroy(handle);
    }

    fn relayout(&mut self, group: &GroupId, activate: bool) -> Result<Placements, MosaicError> {
        let members = self.registry().members(group).to_vec();
        if members.is_empty() {
            return Ok(Vec::new());
        }
        let monitors = self.display.monitors();
        if monitors.is_empty() {
            return Err(MosaicError::NoMonitors);
        }
        Ok(self.engine.layout_group(&members, &monitors, activate, &mut self.server))
    }

    /// Creates a window in `options.group`, creating the group on demand,
    /// and lays the group out again.
    #[instrument(name = "controller::create", skip(self))]
    pub fn create(&mut self, options: CreateOptions) -> Result<WindowHandle, MosaicError> {
        let CreateOptions { monitor, group, title } = options;
        group.validate().map_err(|reason| MosaicError::InvalidGroup {
            group: group.to_string(),
            reason,
        })?;
        let count = self.display.monitor_count();
        if monitor as usize > count {
            return Err(MosaicError::InvalidMonitor { monitor, count });
        }

        let handle = self.server.create_window(title.as_deref())?;
        self.server.intercept_close(handle);
        self.close_handlers.insert(handle, group.clone());
        let entry = WindowEntry::new(handle, monitor).with_title(title);
        if self.registry().add_window(&group, entry) {
            info!(%group, "Group created");
        }
        self.persist();

        let activate = self.settings.activate_on_create;
        if let Err(e) = self.relayout(&group, activate) {
            warn!(%group, "Window created but not laid out: {e}");
        }
        Ok(handle)
    }

    /// Reacts to the user asking to close `handle`.
    #[instrument(name = "controller::close_requested", skip(self))]
    pub fn handle_close_requested(&mut self, handle: WindowHandle) -> CloseOutcome {
        let group = match self.registry().group_of(handle).cloned() {
            Some(group) => group,
            None => match self.close_handlers.get(&handle).cloned() {
                // The backup lost the window, its interception did not.
                Some(recorded) => {
                    warn!(%handle, group = %recorded, "Window missing from registry; restoring it");
                    self.registry().add_window(&recorded, WindowEntry::new(handle, 0));
                    recorded
                }
                None => {
                    warn!(%handle, "Close requested for a window in no group; destroying it");
                    self.destroy(handle);
                    return CloseOutcome::Unknown(handle);
                }
            },
        };

        let members = self.registry().members(&group).len();
        let answer = if group.is_none() || members <= 1 || self.batch_close {
            CloseAnswer::One
        } else {
            let message = format!("Close all {members} windows of group {group}?");
            self.prompt.confirm(&message, self.settings.close_prompt_default)
        };
        debug!(%answer, "Close answer");

        let (windows, group_removed) = match answer {
            CloseAnswer::Cancel => {
                info!(%group, "Close cancelled");
                return CloseOutcome::Cancelled { group };
            }
            CloseAnswer::One => match self.registry().remove_window(handle) {
                Some(removed) => (vec![handle], removed.group_removed),
                None => (vec![handle], false),
            },
            CloseAnswer::All => {
                let members = self.registry().remove_group(&group).unwrap_or_default();
                (members.into_iter().map(|m| m.handle).collect(), !group.is_none())
            }
        };
        for &window in &windows {
            self.destroy(window);
        }
        self.persist();

        if group_removed {
            info!(%group, "Group removed");
        } else if let Err(e) = self.relayout(&group, false) {
            warn!(%group, "Could not lay out group after close: {e}");
        }
        CloseOutcome::Closed { group, windows, group_removed }
    }

    /// Lays one group out again on the current monitors.
    #[instrument(name = "controller::layout", skip(self))]
    pub fn layout(&mut self, group: &GroupId) -> Result<Placements, MosaicError> {
        if self.registry().position(group).is_none() {
            return Err(MosaicError::GroupNotFound(group.clone()));
        }
        self.relayout(group, false)
    }

    /// Lays every group out again, e.g. after a monitor was added or removed.
    #[instrument(name = "controller::layout_all", skip(self))]
    pub fn layout_all(&mut self) -> Result<(), MosaicError> {
        let groups: Vec<GroupId> = self.registry().groups().iter().map(|g| g.id.clone()).collect();
        for group in &groups {
            self.relayout(group, false)?;
        }
        Ok(())
    }

    /// Destroys every window of the target and forgets it.
    #[instrument(name = "controller::close", skip(self))]
    pub fn close(&mut self, target: CloseTarget) -> Result<Vec<WindowHandle>, MosaicError> {
        let removed = match &target {
            CloseTarget::All => self.registry().clear(),
            CloseTarget::Group(group) => self
                .registry()
                .remove_group(group)
                .ok_or_else(|| MosaicError::GroupNotFound(group.clone()))?,
        };
        let handles: Vec<WindowHandle> = removed.into_iter().map(|m| m.handle).collect();
        for &handle in &handles {
            self.destroy(handle);
        }
        if matches!(target, CloseTarget::All) {
            self.close_handlers.clear();
        }
        self.persist();
        info!(windows = handles.len(), "Closed");
        Ok(handles)
    }

    /// Forgets registered windows the window server no longer knows, e.g.
    /// after the host restarted. Groups are laid out again if they shrank.
    #[instrument(name = "controller::prune_stale", skip(self))]
    pub fn prune_stale(&mut self) -> Vec<WindowHandle> {
        let known: Vec<WindowHandle> =
            self.registry().groups().iter().flat_map(|g| g.handles()).collect();
        let stale: Vec<WindowHandle> =
            known.into_iter().filter(|&h| self.server.frame(h).is_none()).collect();
        if stale.is_empty() {
            return stale;
        }

        let mut touched: Vec<GroupId> = Vec::new();
        for &handle in &stale {
            self.close_handlers.remove(&handle);
            if let Some(removed) = self.registry().remove_window(handle) {
                if !removed.group_removed && !touched.contains(&removed.group) {
                    touched.push(removed.group);
                }
            }
        }
        info!(windows = stale.len(), "Pruned stale windows");
        self.persist();
        for group in &touched {
            if let Err(e) = self.relayout(group, false) {
                warn!(%group, "Could not lay out group after pruning: {e}");
            }
        }
        stale
    }

    /// Every group with its member count, `None` group first.
    pub fn list_groups(&mut self) -> Vec<(GroupId, usize)> {
        self.registry().groups().iter().map(|g| (g.id.clone(), g.members.len())).collect()
    }

    pub fn debug_state(&mut self) -> RegistrySnapshot { self.registry().snapshot() }

    #[instrument(name = "controller::handle_event", skip(self))]
    pub fn handle_event(&mut self, event: Event) -> Result<Response, MosaicError> {
        debug!("handle_event");
        use self::MosaicCommand::*;

        match event {
            Event::CloseRequested(handle) => {
                Ok(Response::CloseOutcome(self.handle_close_requested(handle)))
            }
            Event::DisplaysChanged => {
                info!(monitors = self.display.monitor_count(), "Displays changed");
                self.layout_all().map(|()| Response::Done)
            }
            Event::Command(command) => match command {
                Create(options) => self.create(options).map(Response::Created),
                Close(target) => self.close(target).map(Response::Destroyed),
                Layout(group) => self.layout(&group).map(Response::Placements),
                LayoutAll => self.layout_all().map(|()| Response::Done),
                ListGroups => Ok(Response::Groups(self.list_groups())),
                DebugState => Ok(Response::State(self.debug_state())),
                SetBatchClose(batch) => {
                    self.set_batch_close(batch);
                    Ok(Response::Done)
                }
            },
        }
    }
}
