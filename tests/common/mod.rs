//! Shared harness: a coordinator wired to scripted collaborators and a
//! virtual clock.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use marklive::document::{ContentLoadError, DocumentSource, RenderedDocument, document_title};
use marklive::reload::{ReloadCoordinator, Timing};
use marklive::surface::{Notice, RenderSurface, SurfaceError, SurfaceMessage, Viewport};
use marklive::timer::{CycleId, SessionId, VirtualClock};
use marklive::watcher::{FsBackend, RawKind, RawNotification, WatchError};

pub const VIEWPORT_HEIGHT: u32 = 800;

/// Backend that records subscriptions instead of touching the OS.
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub current: Option<SessionId>,
    pub released: Vec<SessionId>,
}

impl FsBackend for FakeBackend {
    type Handle = SessionId;

    fn subscribe(&mut self, session: SessionId, _path: &Path) -> Result<SessionId, WatchError> {
        self.current = Some(session);
        Ok(session)
    }

    fn release(&mut self, handle: SessionId) {
        if self.current == Some(handle) {
            self.current = None;
        }
        self.released.push(handle);
    }

    fn exists(&self, _path: &Path) -> bool {
        true
    }
}

/// Everything the coordinator asked the surface to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RequestScrollSave(CycleId),
    ReplaceContent { cycle: CycleId, title: String },
    RestoreScroll { requested: u32, effective: u32 },
    Notice(Notice),
}

/// Surface that records commands and keeps a viewport like a real display.
#[derive(Debug)]
pub struct RecordingSurface {
    pub commands: Vec<Command>,
    pub viewport: Viewport,
    /// Height the next replaced document renders to.
    pub next_document_height: u32,
    pub connected: bool,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            viewport: Viewport::new(10_000, VIEWPORT_HEIGHT),
            next_document_height: 10_000,
            connected: true,
        }
    }
}

impl RecordingSurface {
    fn check(&self) -> Result<(), SurfaceError> {
        if self.connected {
            Ok(())
        } else {
            Err(SurfaceError::Disconnected)
        }
    }
}

impl RenderSurface for RecordingSurface {
    fn request_scroll_save(&mut self, cycle: CycleId) -> Result<(), SurfaceError> {
        self.check()?;
        self.commands.push(Command::RequestScrollSave(cycle));
        Ok(())
    }

    fn replace_content(
        &mut self,
        cycle: CycleId,
        document: &RenderedDocument,
    ) -> Result<(), SurfaceError> {
        self.check()?;
        self.viewport.replace_document(self.next_document_height);
        self.commands.push(Command::ReplaceContent {
            cycle,
            title: document.title.clone(),
        });
        Ok(())
    }

    fn restore_scroll(&mut self, offset: u32) -> Result<(), SurfaceError> {
        self.check()?;
        let effective = self.viewport.restore(offset);
        self.commands.push(Command::RestoreScroll {
            requested: offset,
            effective,
        });
        Ok(())
    }

    fn show_notice(&mut self, notice: &Notice) -> Result<(), SurfaceError> {
        self.check()?;
        self.commands.push(Command::Notice(notice.clone()));
        Ok(())
    }
}

/// In-memory documents; `None` content means the read fails.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub docs: Rc<RefCell<HashMap<PathBuf, Option<String>>>>,
}

impl DocumentSource for MemorySource {
    fn load(&self, path: &Path) -> Result<RenderedDocument, ContentLoadError> {
        match self.docs.borrow().get(path) {
            Some(Some(text)) => Ok(RenderedDocument {
                title: document_title(path),
                markup: text.clone(),
            }),
            _ => Err(ContentLoadError::Read {
                path: path.to_path_buf(),
                reason: "No such file or directory".to_string(),
            }),
        }
    }
}

pub type TestCoordinator = ReloadCoordinator<FakeBackend, RecordingSurface, MemorySource>;

pub struct Harness {
    pub coordinator: TestCoordinator,
    pub clock: VirtualClock,
    pub docs: Rc<RefCell<HashMap<PathBuf, Option<String>>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_timing(Timing::default())
    }

    pub fn with_timing(timing: Timing) -> Self {
        let source = MemorySource::default();
        let docs = source.docs.clone();
        Self {
            coordinator: ReloadCoordinator::new(
                FakeBackend::default(),
                RecordingSurface::default(),
                source,
                timing,
            ),
            clock: VirtualClock::new(),
            docs,
        }
    }

    pub fn put(&self, path: &str, text: &str) {
        self.docs
            .borrow_mut()
            .insert(PathBuf::from(path), Some(text.to_string()));
    }

    pub fn break_file(&self, path: &str) {
        self.docs.borrow_mut().insert(PathBuf::from(path), None);
    }

    pub fn open(&mut self, path: &str) {
        if !self.docs.borrow().contains_key(Path::new(path)) {
            self.put(path, "# fresh");
        }
        self.coordinator.open(Path::new(path), &mut self.clock);
    }

    fn raw(&mut self, path: &str, kind: RawKind) {
        let session = self
            .coordinator
            .watcher()
            .backend()
            .current
            .unwrap_or(SessionId(0));
        self.coordinator
            .handle_raw(RawNotification::new(session, path, kind), &mut self.clock);
    }

    pub fn write(&mut self, path: &str) {
        self.raw(path, RawKind::Write);
    }

    pub fn remove(&mut self, path: &str) {
        self.raw(path, RawKind::Remove);
    }

    pub fn create(&mut self, path: &str) {
        self.raw(path, RawKind::Create);
    }

    /// Advance virtual time, firing every timer that comes due on the way.
    pub fn advance(&mut self, ms: u64) {
        let target = self.clock.now() + Duration::from_millis(ms);
        while let Some(token) = self.clock.next_due(target) {
            self.coordinator.handle_timer(token, &mut self.clock);
        }
        self.clock.advance_to(target);
    }

    /// Write once and let the debounce window elapse.
    pub fn edit(&mut self, path: &str) {
        self.write(path);
        let window = self.coordinator.watcher().debounce_window().as_millis() as u64;
        self.advance(window);
    }

    pub fn surface(&mut self) -> &mut RecordingSurface {
        self.coordinator.surface_mut()
    }

    pub fn commands(&self) -> &[Command] {
        &self.coordinator.surface().commands
    }

    pub fn scroll_requests(&self) -> Vec<CycleId> {
        self.commands()
            .iter()
            .filter_map(|c| match c {
                Command::RequestScrollSave(cycle) => Some(*cycle),
                _ => None,
            })
            .collect()
    }

    pub fn replaced(&self) -> Vec<CycleId> {
        self.commands()
            .iter()
            .filter_map(|c| match c {
                Command::ReplaceContent { cycle, .. } => Some(*cycle),
                _ => None,
            })
            .collect()
    }

    pub fn restores(&self) -> Vec<(u32, u32)> {
        self.commands()
            .iter()
            .filter_map(|c| match c {
                Command::RestoreScroll {
                    requested,
                    effective,
                } => Some((*requested, *effective)),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.commands()
            .iter()
            .filter_map(|c| match c {
                Command::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    /// Answer the most recent scroll-save request.
    pub fn reply_scroll(&mut self, offset: u32) -> CycleId {
        let cycle = *self.scroll_requests().last().expect("no scroll request");
        self.send(SurfaceMessage::ScrollSaved { cycle, offset });
        cycle
    }

    /// Signal content ready for the most recent replacement.
    pub fn content_ready(&mut self) -> CycleId {
        let cycle = *self.replaced().last().expect("no content replaced");
        self.send(SurfaceMessage::ContentReady { cycle });
        cycle
    }

    pub fn send(&mut self, message: SurfaceMessage) {
        self.coordinator.handle_surface(message, &mut self.clock);
    }
}
