//! On-disk accession storage.
//!
//! ```text
//! {root}/
//! ├── incoming/            files streamed from requests, not yet kept
//! │   └── {uuid}.part
//! └── uploads/
//!     └── {accession id}/
//!         ├── accession.json
//!         └── {file name}
//! ```
//!
//! Files are staged while the request streams in and only moved under
//! `uploads/` once the whole submission has passed validation.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tokio::fs;
use uuid::Uuid;

use crate::api::logs::{log_success_indent, log_warning};
use crate::error::{StorageError, StorageResult};
use crate::models::{Accession, AccessionForm, StoredFile, UploadedFile};

const INCOMING_DIR: &str = "incoming";
const UPLOADS_DIR: &str = "uploads";
const METADATA_FILE: &str = "accession.json";

/// Counts shown on the stats endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub accession_count: usize,
    pub file_count: usize,
}

#[derive(Debug, Clone)]
pub struct AccessionStore {
    root: PathBuf,
}

impl AccessionStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    /// Create the storage directories if missing.
    pub async fn ensure_dirs(&self) -> StorageResult<()> {
        fs::create_dir_all(self.root.join(INCOMING_DIR)).await?;
        fs::create_dir_all(self.uploads_dir()).await?;
        Ok(())
    }

    /// Open a fresh staging file for an incoming upload.
    pub async fn stage(&self) -> StorageResult<(PathBuf, fs::File)> {
        let dir = self.root.join(INCOMING_DIR);
        fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.part", Uuid::new_v4()));
        let file = fs::File::create(&path).await?;
        Ok((path, file))
    }

    /// Keep a validated submission. `files` pairs each upload with its
    /// detected content type.
    ///
    /// On failure nothing is kept: the accession directory and any staged
    /// file not yet moved are removed.
    pub async fn save(
        &self,
        donor: AccessionForm,
        files: Vec<(UploadedFile, String)>,
    ) -> StorageResult<Accession> {
        let accession = Accession::new(donor);
        let id = accession.id;
        let staged: Vec<PathBuf> = files.iter().map(|(u, _)| u.staged_path.clone()).collect();

        match self.store_files(accession, files).await {
            Ok(accession) => Ok(accession),
            Err(e) => {
                log_warning(format!("Rolling back accession {}: {}", id, e));
                for path in &staged {
                    remove_if_present(path).await;
                }
                let dir = self.uploads_dir().join(id.to_string());
                if let Err(err) = fs::remove_dir_all(&dir).await {
                    if err.kind() != std::io::ErrorKind::NotFound {
                        log_warning(format!("Could not remove {}: {}", dir.display(), err));
                    }
                }
                Err(e)
            }
        }
    }

    async fn store_files(
        &self,
        mut accession: Accession,
        files: Vec<(UploadedFile, String)>,
    ) -> StorageResult<Accession> {
        let relative_dir = PathBuf::from(UPLOADS_DIR).join(accession.id.to_string());
        fs::create_dir_all(self.root.join(&relative_dir)).await?;

        for (upload, content_type) in files {
            let name = sanitize_filename(&upload.file_name)?;
            let name = unique_name(&name, &accession.files);
            let relative = relative_dir.join(&name);
            move_file(&upload.staged_path, &self.root.join(&relative)).await?;
            log_success_indent(format!("Stored {} ({} bytes)", name, upload.size), 1);

            accession.files.push(StoredFile {
                file_name: name,
                path: relative,
                file_description: upload.description,
                content_type,
                size: upload.size,
                date_file_submitted: Utc::now(),
            });
        }

        self.write_metadata(&accession).await?;
        Ok(accession)
    }

    /// Remove staged files of a rejected submission.
    pub async fn discard(&self, files: &[UploadedFile]) {
        for file in files {
            remove_if_present(&file.staged_path).await;
        }
    }

    pub async fn load(&self, id: Uuid) -> StorageResult<Accession> {
        let path = self.uploads_dir().join(id.to_string()).join(METADATA_FILE);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Count stored accessions and their files.
    pub async fn stats(&self) -> StorageResult<StoreStats> {
        let mut stats = StoreStats::default();
        let mut entries = match fs::read_dir(self.uploads_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let Ok(id) = entry.file_name().to_string_lossy().parse::<Uuid>() else {
                continue;
            };
            if let Ok(accession) = self.load(id).await {
                stats.accession_count += 1;
                stats.file_count += accession.files.len();
            }
        }
        Ok(stats)
    }

    async fn write_metadata(&self, accession: &Accession) -> StorageResult<()> {
        let path = self
            .uploads_dir()
            .join(accession.id.to_string())
            .join(METADATA_FILE);
        let json = serde_json::to_string_pretty(accession)?;
        fs::write(path, json).await?;
        Ok(())
    }
}

async fn remove_if_present(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log_warning(format!("Could not remove {}: {}", path.display(), e)),
    }
}

async fn move_file(from: &Path, to: &Path) -> StorageResult<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    // Different filesystems
    fs::copy(from, to).await?;
    fs::remove_file(from).await?;
    Ok(())
}

/// Strip any path and reserved characters from a browser-supplied name.
pub fn sanitize_filename(filename: &str) -> StorageResult<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();

    let sanitized: String = base
        .chars()
        .map(|c| match c {
            c if c.is_control() => '_',
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    let sanitized = sanitized.trim();

    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return Err(StorageError::InvalidFileName(filename.to_string()));
    }

    let mut name = if sanitized.starts_with('.') {
        format!("_{}", sanitized)
    } else {
        sanitized.to_string()
    };
    if name.len() > 255 {
        let mut end = 255;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    Ok(name)
}

/// `name`, or `stem_1.ext`, `stem_2.ext`, ... if already taken.
fn unique_name(name: &str, taken: &[StoredFile]) -> String {
    let is_taken = |candidate: &str| taken.iter().any(|f| f.file_name == candidate);
    if !is_taken(name) {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    (1..)
        .map(|n| match ext {
            Some(ext) => format!("{}_{}.{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        })
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Affiliation;
    use tokio::io::AsyncWriteExt;

    fn donor() -> AccessionForm {
        AccessionForm {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email_address: "ada@example.edu".into(),
            phone_number: String::new(),
            affiliation: Affiliation::Staff,
            organization_name: String::new(),
            description: String::new(),
        }
    }

    async fn staged(store: &AccessionStore, name: &str, bytes: &[u8]) -> UploadedFile {
        let (path, mut file) = store.stage().await.unwrap();
        file.write_all(bytes).await.unwrap();
        file.flush().await.unwrap();
        UploadedFile {
            file_name: name.into(),
            declared_type: "application/pdf".into(),
            size: bytes.len() as u64,
            head: bytes.to_vec(),
            staged_path: path,
            description: format!("about {}", name),
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_filename("../../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename("C:\\fakepath\\scan.png").unwrap(), "scan.png");
        assert_eq!(sanitize_filename("a<b>.txt").unwrap(), "a_b_.txt");
        assert_eq!(sanitize_filename(".hidden").unwrap(), "_.hidden");
        assert!(sanitize_filename("dir/").is_err());
        assert!(sanitize_filename("..").is_err());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_nothing_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let store = AccessionStore::new(tmp.path());
        store.ensure_dirs().await.unwrap();

        let files = vec![
            (staged(&store, "good.pdf", b"%PDF-1.4 good").await, "application/pdf".to_string()),
            (staged(&store, "", b"%PDF-1.4 nameless").await, "application/pdf".to_string()),
            (staged(&store, "later.pdf", b"%PDF-1.4 later").await, "application/pdf".to_string()),
        ];

        let err = store.save(donor(), files).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidFileName(_)));

        let incoming: Vec<_> = std::fs::read_dir(tmp.path().join("incoming")).unwrap().collect();
        assert!(incoming.is_empty());
        let uploads: Vec<_> = std::fs::read_dir(store.uploads_dir()).unwrap().collect();
        assert!(uploads.is_empty());
        assert_eq!(store.stats().await.unwrap(), StoreStats::default());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = AccessionStore::new(tmp.path());
        store.ensure_dirs().await.unwrap();

        let a = staged(&store, "letter.pdf", b"%PDF-1.4 first").await;
        let b = staged(&store, "letter.pdf", b"%PDF-1.4 second").await;
        let staged_a = a.staged_path.clone();

        let accession = store
            .save(donor(), vec![(a, "application/pdf".into()), (b, "application/pdf".into())])
            .await
            .unwrap();

        assert!(!staged_a.exists());
        let names: Vec<_> = accession.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["letter.pdf", "letter_1.pdf"]);

        let dir = tmp.path().join("uploads").join(accession.id.to_string());
        assert_eq!(std::fs::read(dir.join("letter_1.pdf")).unwrap(), b"%PDF-1.4 second");
        assert!(dir.join("accession.json").exists());

        let loaded = store.load(accession.id).await.unwrap();
        assert_eq!(loaded, accession);
        assert_eq!(loaded.files[0].file_description, "about letter.pdf");
    }

    #[tokio::test]
    async fn test_discard_removes_staged_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = AccessionStore::new(tmp.path());
        let upload = staged(&store, "x.pdf", b"%PDF").await;
        assert!(upload.staged_path.exists());

        store.discard(std::slice::from_ref(&upload)).await;
        assert!(!upload.staged_path.exists());
    }

    #[tokio::test]
    async fn test_stats_and_missing_accession() {
        let tmp = tempfile::tempdir().unwrap();
        let store = AccessionStore::new(tmp.path());
        assert_eq!(store.stats().await.unwrap(), StoreStats::default());

        let upload = staged(&store, "x.pdf", b"%PDF").await;
        store.save(donor(), vec![(upload, "application/pdf".into())]).await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.accession_count, 1);
        assert_eq!(stats.file_count, 1);

        let err = store.load(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
