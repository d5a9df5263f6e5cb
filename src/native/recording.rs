//! In-memory status bar that records every accepted call.
//!
//! Backs the binary's headless mode and the test suite.

use super::{NativeHandle, ScreenFrame, StatusBar};
use crate::error::NativeError;
use crate::tray::icon::NativeImage;
use crate::tray::IconId;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const ITEM_WIDTH: f64 = 22.0;

#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    Create { icon: IconId, handle: NativeHandle },
    Destroy { handle: NativeHandle },
    SetTitle { handle: NativeHandle, title: String },
    SetTooltip { handle: NativeHandle, tooltip: String },
    SetImage { handle: NativeHandle, width: u32, height: u32, is_template: bool },
    SetHighlighted { handle: NativeHandle, highlighted: bool },
    ScreenFrame { handle: NativeHandle },
    AddMenuItem { handle: NativeHandle, label: String, index: usize, tag: u64, enabled: bool },
    RemoveMenuItem { handle: NativeHandle, index: usize },
}

impl NativeCall {
    pub fn op(&self) -> NativeOp {
        match self {
            NativeCall::Create { .. } => NativeOp::Create,
            NativeCall::Destroy { .. } => NativeOp::Destroy,
            NativeCall::SetTitle { .. } => NativeOp::SetTitle,
            NativeCall::SetTooltip { .. } => NativeOp::SetTooltip,
            NativeCall::SetImage { .. } => NativeOp::SetImage,
            NativeCall::SetHighlighted { .. } => NativeOp::SetHighlighted,
            NativeCall::ScreenFrame { .. } => NativeOp::ScreenFrame,
            NativeCall::AddMenuItem { .. } => NativeOp::AddMenuItem,
            NativeCall::RemoveMenuItem { .. } => NativeOp::RemoveMenuItem,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeOp {
    Create,
    Destroy,
    SetTitle,
    SetTooltip,
    SetImage,
    SetHighlighted,
    ScreenFrame,
    AddMenuItem,
    RemoveMenuItem,
}

#[derive(Debug, Clone)]
struct LiveItem {
    icon: IconId,
    title: String,
    menu: Vec<(String, u64, bool)>,
}

#[derive(Default)]
struct Recorder {
    next_handle: u64,
    live: HashMap<NativeHandle, LiveItem>,
    calls: Vec<NativeCall>,
    failing: HashSet<NativeOp>,
    create_delay: Duration,
}

impl Recorder {
    fn check(&self, op: NativeOp) -> Result<(), NativeError> {
        if self.failing.contains(&op) {
            return Err(NativeError::Backend(format!("{:?} rejected", op)));
        }
        Ok(())
    }

    fn item_mut(&mut self, handle: NativeHandle) -> Result<&mut LiveItem, NativeError> {
        self.live
            .get_mut(&handle)
            .ok_or(NativeError::InvalidHandle(handle))
    }
}

#[derive(Default)]
pub struct RecordingStatusBar {
    inner: Mutex<Recorder>,
}

impl RecordingStatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    fn recorder(&self) -> MutexGuard<'_, Recorder> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every subsequent call of `op` fail until switched off again.
    pub fn fail(&self, op: NativeOp, failing: bool) {
        let mut recorder = self.recorder();
        if failing {
            recorder.failing.insert(op);
        } else {
            recorder.failing.remove(&op);
        }
    }

    /// Stalls `create` to widen race windows.
    pub fn set_create_delay(&self, delay: Duration) {
        self.recorder().create_delay = delay;
    }

    pub fn calls(&self) -> Vec<NativeCall> {
        self.recorder().calls.clone()
    }

    pub fn count(&self, op: NativeOp) -> usize {
        self.recorder().calls.iter().filter(|c| c.op() == op).count()
    }

    pub fn clear_calls(&self) {
        self.recorder().calls.clear();
    }

    pub fn live_handles(&self) -> Vec<NativeHandle> {
        let mut handles: Vec<_> = self.recorder().live.keys().copied().collect();
        handles.sort_by_key(|h| h.raw());
        handles
    }

    pub fn live_count(&self) -> usize {
        self.recorder().live.len()
    }

    pub fn icon_for(&self, handle: NativeHandle) -> Option<IconId> {
        self.recorder().live.get(&handle).map(|item| item.icon)
    }

    pub fn title_of(&self, handle: NativeHandle) -> Option<String> {
        self.recorder().live.get(&handle).map(|item| item.title.clone())
    }

    pub fn menu_labels(&self, handle: NativeHandle) -> Vec<String> {
        self.recorder()
            .live
            .get(&handle)
            .map(|item| item.menu.iter().map(|(label, _, _)| label.clone()).collect())
            .unwrap_or_default()
    }

    pub fn menu_tags(&self, handle: NativeHandle) -> Vec<u64> {
        self.recorder()
            .live
            .get(&handle)
            .map(|item| item.menu.iter().map(|(_, tag, _)| *tag).collect())
            .unwrap_or_default()
    }
}

impl StatusBar for RecordingStatusBar {
    fn create(&self, icon: IconId) -> Result<NativeHandle, NativeError> {
        let delay = {
            let recorder = self.recorder();
            recorder.check(NativeOp::Create)?;
            recorder.create_delay
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut recorder = self.recorder();
        recorder.next_handle += 1;
        let handle = NativeHandle::new(recorder.next_handle);
        recorder.live.insert(
            handle,
            LiveItem {
                icon,
                title: String::new(),
                menu: Vec::new(),
            },
        );
        recorder.calls.push(NativeCall::Create { icon, handle });
        Ok(handle)
    }

    fn destroy(&self, handle: NativeHandle) -> Result<(), NativeError> {
        let mut recorder = self.recorder();
        recorder.check(NativeOp::Destroy)?;
        if recorder.live.remove(&handle).is_none() {
            return Err(NativeError::InvalidHandle(handle));
        }
        recorder.calls.push(NativeCall::Destroy { handle });
        Ok(())
    }

    fn set_title(&self, handle: NativeHandle, title: &str) -> Result<(), NativeError> {
        let mut recorder = self.recorder();
        recorder.check(NativeOp::SetTitle)?;
        recorder.item_mut(handle)?.title = title.to_string();
        recorder.calls.push(NativeCall::SetTitle {
            handle,
            title: title.to_string(),
        });
        Ok(())
    }

    fn set_tooltip(&self, handle: NativeHandle, tooltip: &str) -> Result<(), NativeError> {
        let mut recorder = self.recorder();
        recorder.check(NativeOp::SetTooltip)?;
        recorder.item_mut(handle)?;
        recorder.calls.push(NativeCall::SetTooltip {
            handle,
            tooltip: tooltip.to_string(),
        });
        Ok(())
    }

    fn set_image(&self, handle: NativeHandle, image: &NativeImage) -> Result<(), NativeError> {
        let mut recorder = self.recorder();
        recorder.check(NativeOp::SetImage)?;
        recorder.item_mut(handle)?;
        recorder.calls.push(NativeCall::SetImage {
            handle,
            width: image.width,
            height: image.height,
            is_template: image.is_template,
        });
        Ok(())
    }

    fn set_highlighted(&self, handle: NativeHandle, highlighted: bool) -> Result<(), NativeError> {
        let mut recorder = self.recorder();
        recorder.check(NativeOp::SetHighlighted)?;
        recorder.item_mut(handle)?;
        recorder.calls.push(NativeCall::SetHighlighted { handle, highlighted });
        Ok(())
    }

    fn screen_frame(&self, handle: NativeHandle) -> Result<ScreenFrame, NativeError> {
        let mut recorder = self.recorder();
        recorder.check(NativeOp::ScreenFrame)?;
        recorder.item_mut(handle)?;
        recorder.calls.push(NativeCall::ScreenFrame { handle });
        Ok(ScreenFrame {
            x: handle.raw() as f64 * ITEM_WIDTH,
            y: 0.0,
            width: ITEM_WIDTH,
            height: ITEM_WIDTH,
        })
    }

    fn add_menu_item(
        &self,
        handle: NativeHandle,
        label: &str,
        index: usize,
        tag: u64,
        enabled: bool,
    ) -> Result<(), NativeError> {
        let mut recorder = self.recorder();
        recorder.check(NativeOp::AddMenuItem)?;
        let item = recorder.item_mut(handle)?;
        if index > item.menu.len() {
            return Err(NativeError::MenuIndex {
                index,
                count: item.menu.len(),
            });
        }
        item.menu.insert(index, (label.to_string(), tag, enabled));
        recorder.calls.push(NativeCall::AddMenuItem {
            handle,
            label: label.to_string(),
            index,
            tag,
            enabled,
        });
        Ok(())
    }

    fn remove_menu_item(&self, handle: NativeHandle, index: usize) -> Result<(), NativeError> {
        let mut recorder = self.recorder();
        recorder.check(NativeOp::RemoveMenuItem)?;
        let item = recorder.item_mut(handle)?;
        if index >= item.menu.len() {
            return Err(NativeError::MenuIndex {
                index,
                count: item.menu.len(),
            });
        }
        item.menu.remove(index);
        recorder.calls.push(NativeCall::RemoveMenuItem { handle, index });
        Ok(())
    }
}
