//! File staging: the list of files waiting to be submitted.
//!
//! Pure bookkeeping. Browser file objects stay in the page's file arena;
//! this module only sees their [`FileInfo`] and addresses them by
//! [`FileHandle`].

use crate::config::UploadConfig;
use crate::types::{FileHandle, FileInfo, FileStatus, Preview, RejectReason, StagedFile};

/// Whether the list has anything in it. Controls follow this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StagingState {
    Empty,
    HasFiles,
}

/// Choose the preview for a file: thumbnail for images, else an icon.
pub fn preview_for(config: &UploadConfig, mime: &str) -> Preview {
    if mime.starts_with("image") {
        Preview::Thumbnail
    } else {
        Preview::Icon(config.icons.icon_for(mime).to_string())
    }
}

#[derive(Clone, Debug, Default)]
pub struct StagingArea {
    files: Vec<StagedFile>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn state(&self) -> StagingState {
        if self.files.is_empty() {
            StagingState::Empty
        } else {
            StagingState::HasFiles
        }
    }

    pub fn get(&self, handle: FileHandle) -> Option<&StagedFile> {
        self.files.iter().find(|f| f.handle == handle)
    }

    fn count_accepted(&self) -> usize {
        self.files
            .iter()
            .filter(|f| !matches!(f.status, FileStatus::Rejected(_)))
            .count()
    }

    fn check(&self, config: &UploadConfig, info: &FileInfo) -> Option<RejectReason> {
        if info.size > config.max_file_size_bytes() {
            return Some(RejectReason::TooLarge { max_mb: config.max_filesize_mb });
        }
        if !config.accept.matches(&info.name, &info.mime) {
            return Some(RejectReason::UnsupportedType);
        }
        if self.count_accepted() >= config.max_files {
            return Some(RejectReason::LimitReached);
        }
        if info.size < config.min_file_size {
            return Some(RejectReason::TooSmall);
        }
        None
    }

    /// Stage a file. Rejected files stay listed with their error marker.
    pub fn add(&mut self, config: &UploadConfig, info: FileInfo) -> &StagedFile {
        let status = match self.check(config, &info) {
            Some(reason) => {
                log::info!("Rejected {} ({} bytes): {}", info.name, info.size, reason);
                FileStatus::Rejected(reason)
            }
            None => FileStatus::Queued,
        };
        let preview = preview_for(config, &info.mime);

        self.files.push(StagedFile {
            handle: info.handle,
            name: info.name,
            size: info.size,
            mime: info.mime,
            preview,
            status,
            description: String::new(),
        });
        &self.files[self.files.len() - 1]
    }

    pub fn remove(&mut self, handle: FileHandle) -> Option<StagedFile> {
        let index = self.files.iter().position(|f| f.handle == handle)?;
        Some(self.files.remove(index))
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn set_description(&mut self, handle: FileHandle, text: String) -> bool {
        match self.files.iter_mut().find(|f| f.handle == handle) {
            Some(file) => {
                file.description = text;
                true
            }
            None => false,
        }
    }

    /// Files that go out with the next submission, capped at `limit`.
    pub fn eligible(&self, limit: usize) -> Vec<&StagedFile> {
        self.files.iter().filter(|f| f.status.is_eligible()).take(limit).collect()
    }

    /// Mark the given files as in flight.
    pub fn mark_uploading(&mut self, handles: &[FileHandle]) {
        for file in self.files.iter_mut().filter(|f| handles.contains(&f.handle)) {
            file.status = FileStatus::Uploading;
        }
    }

    pub fn mark_submitted(&mut self) {
        for file in self.files.iter_mut().filter(|f| f.status == FileStatus::Uploading) {
            file.status = FileStatus::Submitted;
        }
    }

    /// Transport failed: every in-flight file carries the error.
    pub fn mark_transfer_failed(&mut self, message: &str) {
        for file in self.files.iter_mut().filter(|f| f.status == FileStatus::Uploading) {
            file.status = FileStatus::TransferFailed(message.to_string());
        }
    }

    /// Server answered with per-file errors: named in-flight files are
    /// rejected, the rest go back to the queue.
    pub fn settle_server_errors(&mut self, errors: &[(String, String)]) {
        for file in self.files.iter_mut().filter(|f| f.status == FileStatus::Uploading) {
            file.status = match errors.iter().find(|(name, _)| *name == file.name) {
                Some((_, message)) => FileStatus::ServerRejected(message.clone()),
                None => FileStatus::Queued,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(handle: u32, name: &str, size: u64, mime: &str) -> FileInfo {
        FileInfo {
            handle: FileHandle(handle),
            name: name.to_string(),
            size,
            mime: mime.to_string(),
        }
    }

    #[test]
    fn test_small_file_is_rejected_and_never_eligible() {
        let config = UploadConfig::default();
        let mut area = StagingArea::new();
        let file = area.add(&config, info(1, "tiny.pdf", 1023, "application/pdf"));
        assert_eq!(file.status, FileStatus::Rejected(RejectReason::TooSmall));
        assert!(file.is_errored());
        assert_eq!(area.state(), StagingState::HasFiles);
        assert!(area.eligible(config.parallel_uploads()).is_empty());
    }

    #[test]
    fn test_boundary_size_is_accepted() {
        let config = UploadConfig::default();
        let mut area = StagingArea::new();
        let file = area.add(&config, info(1, "ok.pdf", 1024, "application/pdf"));
        assert_eq!(file.status, FileStatus::Queued);
        assert_eq!(file.preview, Preview::Icon("file-pdf".into()));
    }

    #[test]
    fn test_previews() {
        let config = UploadConfig::default();
        assert_eq!(preview_for(&config, "image/jpeg"), Preview::Thumbnail);
        assert_eq!(preview_for(&config, "audio/flac"), Preview::Icon("file-audio".into()));
        assert_eq!(preview_for(&config, "application/x-tar"), Preview::Icon("file-o".into()));
    }

    #[test]
    fn test_rejections() {
        let mut config = UploadConfig::default();
        config.max_files = 1;
        config.max_filesize_mb = 1;
        let mut area = StagingArea::new();

        let big = area.add(&config, info(1, "big.pdf", 2 * 1024 * 1024, "application/pdf"));
        assert_eq!(big.status, FileStatus::Rejected(RejectReason::TooLarge { max_mb: 1 }));

        let zip = area.add(&config, info(2, "a.zip", 4096, "application/zip"));
        assert_eq!(zip.status, FileStatus::Rejected(RejectReason::UnsupportedType));

        assert_eq!(area.add(&config, info(3, "a.pdf", 4096, "application/pdf")).status, FileStatus::Queued);
        let extra = area.add(&config, info(4, "b.pdf", 4096, "application/pdf"));
        assert_eq!(extra.status, FileStatus::Rejected(RejectReason::LimitReached));
    }

    #[test]
    fn test_remove_and_clear() {
        let config = UploadConfig::default();
        let mut area = StagingArea::new();
        area.add(&config, info(1, "a.pdf", 4096, "application/pdf"));
        area.add(&config, info(2, "b.pdf", 4096, "application/pdf"));
        assert!(area.remove(FileHandle(1)).is_some());
        assert!(area.remove(FileHandle(1)).is_none());
        assert_eq!(area.len(), 1);
        area.clear();
        assert_eq!(area.state(), StagingState::Empty);
    }

    #[test]
    fn test_server_errors_settle_in_flight_files() {
        let config = UploadConfig::default();
        let mut area = StagingArea::new();
        area.add(&config, info(1, "a.pdf", 4096, "application/pdf"));
        area.add(&config, info(2, "b.pdf", 4096, "application/pdf"));
        area.mark_uploading(&[FileHandle(1), FileHandle(2)]);

        area.settle_server_errors(&[("a.pdf".into(), "Corrupt".into())]);
        assert_eq!(
            area.get(FileHandle(1)).map(|f| f.status.clone()),
            Some(FileStatus::ServerRejected("Corrupt".into()))
        );
        assert_eq!(area.get(FileHandle(2)).map(|f| f.status.clone()), Some(FileStatus::Queued));
        assert_eq!(area.eligible(10).len(), 1);
    }

    #[test]
    fn test_transfer_failure_is_retryable() {
        let config = UploadConfig::default();
        let mut area = StagingArea::new();
        area.add(&config, info(1, "a.pdf", 4096, "application/pdf"));
        area.mark_uploading(&[FileHandle(1)]);
        area.mark_transfer_failed("Server responded with 502");
        assert!(area.files()[0].is_errored());
        assert_eq!(area.eligible(10).len(), 1);
    }
}
