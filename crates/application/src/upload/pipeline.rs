//! Upload batch: stage, transfer, rewrite, persist, clean up.
//!
//! Files are staged under local preview URLs so they can be shown and
//! embedded in content right away. Committing transfers every file to object
//! storage through a presigned URL and records which preview URL maps to
//! which permanent URL.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::try_join_all;
use galleria_domain::{
    AssetUploadRecord, DisplayMetadata, ImageUploadEntry, PresignedUpload, RequestSpec,
    SourceFile, UrlMapping,
};
use parking_lot::Mutex;
use tracing::{debug, error, info, instrument};

use crate::auth::TokenStore;
use crate::ports::{ApiClient, HttpClient, PreviewUrlRegistry};
use crate::upload::UrlSink;
use crate::{expect_success, ApplicationError, ApplicationResult};

/// Issues presigned storage URLs.
pub const PRESIGNED_URL_ENDPOINT: &str = "/api/image/presigned-url";

/// Persists image metadata.
pub const IMAGE_UPLOAD_ENDPOINT: &str = "/api/image/upload";

#[derive(Default)]
struct Batch {
    records: Vec<AssetUploadRecord>,
    mapping: UrlMapping,
    primary_url: Option<String>,
}

/// One upload batch.
///
/// Dropping the pipeline revokes every preview URL it still holds.
pub struct UploadPipeline {
    api: Arc<dyn ApiClient>,
    storage: Arc<dyn HttpClient>,
    previews: Arc<dyn PreviewUrlRegistry>,
    tokens: TokenStore,
    batch: Mutex<Batch>,
    uploading: AtomicBool,
}

impl UploadPipeline {
    /// Creates an empty batch.
    ///
    /// `storage` must not attach credentials; presigned URLs carry their own.
    #[must_use]
    pub fn new(
        api: Arc<dyn ApiClient>,
        storage: Arc<dyn HttpClient>,
        previews: Arc<dyn PreviewUrlRegistry>,
        tokens: TokenStore,
    ) -> Self {
        Self {
            api,
            storage,
            previews,
            tokens,
            batch: Mutex::new(Batch::default()),
            uploading: AtomicBool::new(false),
        }
    }

    /// Adds files to the batch and returns their preview URLs in input order.
    ///
    /// Nothing is staged if any file is invalid or a preview URL cannot be
    /// created; the error is logged and the result is empty.
    pub async fn stage_files(&self, files: Vec<SourceFile>) -> Vec<String> {
        if files.is_empty() {
            error!("No files to stage");
            return Vec::new();
        }
        if let Some((file, e)) = files.iter().find_map(|f| f.validate().err().map(|e| (f, e))) {
            error!(filename = %file.name, error = %e, "Rejected file while staging");
            return Vec::new();
        }

        let uploader = self.tokens.current_user().await.map(|u| u.username);
        let mut urls = Vec::with_capacity(files.len());
        for file in &files {
            match self.previews.create(file) {
                Ok(url) => urls.push(url),
                Err(e) => {
                    error!(filename = %file.name, error = %e, "Failed to create preview URL");
                    for url in &urls {
                        self.previews.revoke(url);
                    }
                    return Vec::new();
                }
            }
        }

        let mut batch = self.batch.lock();
        batch.records.extend(
            files
                .into_iter()
                .zip(&urls)
                .map(|(file, url)| AssetUploadRecord::staged(file, url.clone(), uploader.as_deref())),
        );
        debug!(staged = urls.len(), total = batch.records.len(), "Files staged");
        urls
    }

    /// Uploads every staged file that has no permanent URL yet.
    ///
    /// With `register` set, the first record's permanent URL is kept as the
    /// primary URL and returned.
    ///
    /// # Errors
    ///
    /// Returns the first transfer failure. Files that finished before it keep
    /// their mapping entries.
    #[instrument(skip(self))]
    pub async fn upload_all(&self, register: bool) -> ApplicationResult<Option<String>> {
        let pending: Vec<(String, SourceFile)> = self
            .batch
            .lock()
            .records
            .iter()
            .filter(|r| !r.is_committed())
            .map(|r| (r.temporary_preview_url.clone(), r.source_file.clone()))
            .collect();

        let _uploading = UploadingFlag::raise(&self.uploading);
        try_join_all(
            pending
                .iter()
                .map(|(preview, file)| self.transfer(preview, file)),
        )
        .await?;
        info!(files = pending.len(), "Upload batch committed");

        if !register {
            return Ok(None);
        }
        let mut batch = self.batch.lock();
        let primary = batch.records.first().and_then(|r| r.permanent_url.clone());
        batch.primary_url.clone_from(&primary);
        Ok(primary)
    }

    async fn transfer(&self, preview: &str, file: &SourceFile) -> ApplicationResult<()> {
        let result = self.transfer_inner(preview, file).await;
        if let Err(e) = &result {
            error!(filename = %file.name, error = %e, "File upload failed");
        }
        result
    }

    async fn transfer_inner(&self, preview: &str, file: &SourceFile) -> ApplicationResult<()> {
        let request = RequestSpec::get(PRESIGNED_URL_ENDPOINT)
            .with_query("filename", &file.name)
            .with_query("filetype", &file.mime_type);
        let target: PresignedUpload = expect_success(self.api.send(request).await?)?.json_body()?;

        let put = RequestSpec::put_bytes(target.presigned_url, file.mime_type.clone(), file.data.clone());
        let response = self.storage.execute(put).await?;
        if !response.is_success() {
            return Err(ApplicationError::TransferFailed {
                filename: file.name.clone(),
                status: response.status.as_u16(),
            });
        }

        let mut batch = self.batch.lock();
        let Some(record) = batch
            .records
            .iter_mut()
            .find(|r| r.temporary_preview_url == preview)
        else {
            debug!(filename = %file.name, "Batch cleaned up during transfer");
            return Ok(());
        };
        record.permanent_url = Some(target.image_url.clone());
        batch.mapping.insert(preview, target.image_url);
        debug!(filename = %file.name, "File uploaded");
        Ok(())
    }

    /// Replaces every mapped preview URL in `text` with its permanent URL.
    #[must_use]
    pub fn rewrite_content(&self, text: &str) -> String {
        self.batch.lock().mapping.rewrite(text)
    }

    /// Sends the metadata of every record in one request.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::NotCommitted`] if a record was never
    /// uploaded, or the backend error. Nothing is retried.
    #[instrument(skip(self))]
    pub async fn persist_metadata(&self) -> ApplicationResult<()> {
        let entries: Vec<ImageUploadEntry> = self
            .batch
            .lock()
            .records
            .iter()
            .map(|r| {
                r.upload_entry().ok_or_else(|| ApplicationError::NotCommitted {
                    filename: r.source_file.name.clone(),
                })
            })
            .collect::<ApplicationResult<_>>()?;

        if entries.is_empty() {
            return Ok(());
        }

        let count = entries.len();
        match self.send_metadata(&entries).await {
            Ok(()) => {
                info!(count, "Image metadata saved");
                Ok(())
            }
            Err(e) => {
                error!(count, error = %e, "Failed to save image metadata");
                Err(e)
            }
        }
    }

    async fn send_metadata(&self, entries: &[ImageUploadEntry]) -> ApplicationResult<()> {
        let request = RequestSpec::post_json(IMAGE_UPLOAD_ENDPOINT, &entries)?;
        expect_success(self.api.send(request).await?)?;
        Ok(())
    }

    /// Revokes every preview URL and empties the batch. Safe to call repeatedly.
    pub fn cleanup(&self) {
        let batch = std::mem::take(&mut *self.batch.lock());
        for record in &batch.records {
            self.previews.revoke(&record.temporary_preview_url);
        }
        if !batch.records.is_empty() {
            debug!(revoked = batch.records.len(), "Upload batch cleaned up");
        }
    }

    /// Edits the display metadata of the record staged under `preview`.
    ///
    /// Returns false if no such record exists.
    pub fn update_metadata(&self, preview: &str, edit: impl FnOnce(&mut DisplayMetadata)) -> bool {
        let mut batch = self.batch.lock();
        match batch
            .records
            .iter_mut()
            .find(|r| r.temporary_preview_url == preview)
        {
            Some(record) => {
                edit(&mut record.metadata);
                true
            }
            None => false,
        }
    }

    /// Replaces the contents of `sink` with the permanent URLs, in staging order.
    pub fn collect_permanent_urls(&self, sink: &mut dyn UrlSink) {
        sink.clear();
        for url in self
            .batch
            .lock()
            .records
            .iter()
            .filter_map(|r| r.permanent_url.clone())
        {
            sink.append(url);
        }
    }

    /// Snapshot of the staged records.
    #[must_use]
    pub fn records(&self) -> Vec<AssetUploadRecord> {
        self.batch.lock().records.clone()
    }

    /// Snapshot of the URL mapping.
    #[must_use]
    pub fn url_mapping(&self) -> UrlMapping {
        self.batch.lock().mapping.clone()
    }

    /// URL kept by the last registering upload.
    #[must_use]
    pub fn primary_url(&self) -> Option<String> {
        self.batch.lock().primary_url.clone()
    }

    /// Returns true while [`upload_all`](Self::upload_all) runs.
    #[must_use]
    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::SeqCst)
    }
}

impl Drop for UploadPipeline {
    fn drop(&mut self) {
        self.cleanup();
    }
}

struct UploadingFlag<'a>(&'a AtomicBool);

impl<'a> UploadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for UploadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
