use std::io;

use super::*;
use crate::model::{BackupError, MemoryStore};
use crate::sys::geometry::Rect;
use crate::sys::prompt::ScriptedPrompt;
use crate::sys::screen::StaticDisplay;
use crate::sys::window_server::{CloseRequest, HeadlessWindowServer};

pub type TestController<B = MemoryStore> =
    MosaicController<HeadlessWindowServer, StaticDisplay, B, ScriptedPrompt>;

/// A store whose disk is always full.
#[derive(Debug, Default)]
pub struct FailingStore;

impl BackupStore for FailingStore {
    fn save(&mut self, _key: &str, _snapshot: &RegistrySnapshot) -> Result<(), BackupError> {
        Err(io::Error::other("disk full").into())
    }

    fn load(&self, _key: &str) -> Result<Option<RegistrySnapshot>, BackupError> {
        Err(io::Error::other("disk gone").into())
    }
}

/// `count` 1000x1000 monitors side by side.
pub fn square_monitors(count: usize) -> Vec<Rect> {
    (0..count).map(|i| Rect::new(1000.0 * i as f64, 0.0, 1000.0, 1000.0)).collect()
}

pub fn controller(monitors: Vec<Rect>) -> TestController {
    controller_with_store(monitors, MemoryStore::new())
}

pub fn controller_with_store<B: BackupStore>(monitors: Vec<Rect>, store: B) -> TestController<B> {
    MosaicController::new(
        Settings::default(),
        HeadlessWindowServer::new(),
        StaticDisplay::new(monitors),
        store,
        ScriptedPrompt::new(),
    )
}

pub fn name(s: &str) -> GroupId { GroupId::Name(s.to_string()) }

pub fn create_in<B: BackupStore>(c: &mut TestController<B>, group: GroupId) -> WindowHandle {
    c.create(CreateOptions { group, ..Default::default() }).unwrap()
}

pub fn create_pinned<B: BackupStore>(
    c: &mut TestController<B>,
    group: GroupId,
    monitor: u32,
) -> WindowHandle {
    c.create(CreateOptions { group, monitor, title: None }).unwrap()
}

/// Clicks the window's close button and forwards the intercepted request.
pub fn user_close<B: BackupStore>(c: &mut TestController<B>, handle: WindowHandle) -> CloseOutcome {
    match c.server_mut().request_close(handle) {
        CloseRequest::Intercepted(handle) => c.handle_close_requested(handle),
        other => panic!("close of {handle} was not intercepted: {other:?}"),
    }
}

pub fn frame<B: BackupStore>(c: &TestController<B>, handle: WindowHandle) -> Rect {
    c.server().window(handle).unwrap().frame
}
