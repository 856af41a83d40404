//! Page-owned storage for browser `File` objects.
//!
//! The upload state machine never holds a `web_sys::File`; it holds a
//! [`FileHandle`] issued here. Image files also get an object URL for
//! their thumbnail, revoked when the file leaves the arena.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use web_sys::{File, Url};

use crate::types::{FileHandle, FileInfo};

struct ArenaEntry {
    file: File,
    preview_url: Option<String>,
}

#[derive(Default)]
struct ArenaInner {
    next: u32,
    entries: BTreeMap<FileHandle, ArenaEntry>,
}

#[derive(Clone, Default)]
pub struct FileArena {
    inner: Rc<RefCell<ArenaInner>>,
}

impl FileArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file and describe it for the staging widget.
    pub fn insert(&self, file: File) -> FileInfo {
        let mut inner = self.inner.borrow_mut();
        let handle = FileHandle(inner.next);
        inner.next += 1;

        let mime = file.type_();
        let preview_url = if mime.starts_with("image") {
            Url::create_object_url_with_blob(&file)
                .map_err(|e| log::warn!("No thumbnail for {}: {:?}", file.name(), e))
                .ok()
        } else {
            None
        };

        let info = FileInfo {
            handle,
            name: file.name(),
            size: file.size() as u64,
            mime,
        };
        inner.entries.insert(handle, ArenaEntry { file, preview_url });
        info
    }

    pub fn file(&self, handle: FileHandle) -> Option<File> {
        self.inner.borrow().entries.get(&handle).map(|e| e.file.clone())
    }

    pub fn preview_url(&self, handle: FileHandle) -> Option<String> {
        self.inner
            .borrow()
            .entries
            .get(&handle)
            .and_then(|e| e.preview_url.clone())
    }

    /// Drop every file whose handle is not in `keep`.
    pub fn retain(&self, keep: &[FileHandle]) {
        self.inner.borrow_mut().entries.retain(|handle, entry| {
            let kept = keep.contains(handle);
            if !kept {
                if let Some(url) = entry.preview_url.take() {
                    let _ = Url::revoke_object_url(&url);
                }
            }
            kept
        });
    }
}
