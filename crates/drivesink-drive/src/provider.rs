//! IRemoteTreeProvider implementation over the Drive client
//!
//! Walks the watched folder breadth-first and normalizes every file into
//! a `SnapshotEntry` right here, so the sync core never sees the wire
//! format. Folders are traversed, never emitted.
//!
//! Fingerprint choice: the content checksum when the API reports one,
//! otherwise the modification timestamp (native workspace documents have
//! no checksum). Files reporting neither cannot be change-tracked and are
//! skipped with a warning.

use std::collections::VecDeque;

use tracing::{info, warn};

use drivesink_core::domain::{Fingerprint, RemoteId, RemotePath, SnapshotEntry};
use drivesink_core::ports::{IRemoteTreeProvider, ProviderError};

use crate::client::{DriveClient, DriveFile};

/// Remote tree provider for one watched Drive folder
pub struct DriveTreeProvider {
    client: DriveClient,
    root_folder_id: String,
}

impl DriveTreeProvider {
    /// Creates a provider watching `root_folder_id` through `client`
    pub fn new(client: DriveClient, root_folder_id: impl Into<String>) -> Self {
        Self {
            client,
            root_folder_id: root_folder_id.into(),
        }
    }

    /// Lists every page of one folder's direct children
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<DriveFile>, ProviderError> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_children(folder_id, page_token.as_deref())
                .await?;
            files.extend(page.files);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(files)
    }

    fn normalize(&self, file: &DriveFile, prefix: Option<&RemotePath>) -> Option<SnapshotEntry> {
        // Names are single path segments; a slash in a name would corrupt
        // the path structure.
        let name = file.name.replace('/', "_");

        let path = match prefix {
            Some(parent) => parent.join(&name),
            None => RemotePath::new(&name),
        };
        let path = match path {
            Ok(p) => p,
            Err(err) => {
                warn!(id = %file.id, name = %file.name, %err, "Skipping file with unusable name");
                return None;
            }
        };

        // Checksum wins over timestamp when both are present
        let fingerprint = file
            .md5_checksum
            .as_deref()
            .or(file.modified_time.as_deref())
            .and_then(|v| Fingerprint::new(v).ok());
        let fingerprint = match fingerprint {
            Some(fp) => fp,
            None => {
                warn!(id = %file.id, path = %path, "Skipping file with no fingerprint source");
                return None;
            }
        };

        let remote_id = match RemoteId::new(&file.id) {
            Ok(id) => id,
            Err(err) => {
                warn!(name = %file.name, %err, "Skipping file with invalid id");
                return None;
            }
        };

        Some(SnapshotEntry {
            remote_id,
            path,
            fingerprint,
            size_bytes: file.size_bytes(),
        })
    }
}

#[async_trait::async_trait]
impl IRemoteTreeProvider for DriveTreeProvider {
    async fn list_recursive(&self) -> Result<Vec<SnapshotEntry>, ProviderError> {
        let mut entries = Vec::new();
        let mut queue: VecDeque<(String, Option<RemotePath>)> = VecDeque::new();
        queue.push_back((self.root_folder_id.clone(), None));

        while let Some((folder_id, prefix)) = queue.pop_front() {
            for file in self.list_folder(&folder_id).await? {
                if file.is_folder() {
                    let name = file.name.replace('/', "_");
                    let child_prefix = match prefix.as_ref() {
                        Some(parent) => parent.join(&name),
                        None => RemotePath::new(&name),
                    };
                    match child_prefix {
                        Ok(p) => queue.push_back((file.id.clone(), Some(p))),
                        Err(err) => {
                            warn!(id = %file.id, name = %file.name, %err, "Skipping folder with unusable name");
                        }
                    }
                } else if let Some(entry) = self.normalize(&file, prefix.as_ref()) {
                    entries.push(entry);
                }
            }
        }

        info!(files = entries.len(), root = %self.root_folder_id, "Remote tree listed");
        Ok(entries)
    }

    async fn fetch_content(&self, remote_id: &RemoteId) -> Result<Vec<u8>, ProviderError> {
        self.client.download(remote_id.as_str()).await
    }
}
