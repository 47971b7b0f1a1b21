//! Asset upload types.
//!
//! A batch of [`AssetUploadRecord`]s moves from staged (temporary preview
//! URL only) to committed (permanent URL assigned). The [`UrlMapping`]
//! remembers which preview URL became which permanent URL so authored
//! content can be rewritten afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Uploader name recorded when nobody is signed in.
pub const GUEST_UPLOADER: &str = "GUEST";

/// A file selected by the user, held in memory until it is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File name including extension.
    pub name: String,
    /// MIME type sent to storage.
    pub mime_type: String,
    /// File contents.
    pub data: Vec<u8>,
}

impl SourceFile {
    /// Creates a file, inferring the MIME type from the extension.
    #[must_use]
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            mime_type,
            data,
        }
    }

    /// Overrides the inferred MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Checks that the file can be staged.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidFile`] for a nameless or empty file.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidFile {
                name: self.name.clone(),
                reason: "file name is empty".to_string(),
            });
        }
        if self.data.is_empty() {
            return Err(DomainError::InvalidFile {
                name: self.name.clone(),
                reason: "file is empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Content classification of an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageGrade(pub String);

impl ImageGrade {
    /// The default classification.
    pub const GENERAL: &'static str = "GENERAL";

    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ImageGrade {
    fn default() -> Self {
        Self(Self::GENERAL.to_string())
    }
}

/// A tag attached to an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Tag id, absent for new tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Unique tag name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Tag {
    /// Creates a new tag with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            category: None,
        }
    }
}

/// User-editable metadata shown alongside an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMetadata {
    /// Display name, initially the file name.
    pub image_name: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Where the image comes from.
    pub source: Option<String>,
    /// Who made it.
    pub artist: Option<String>,
    /// Classification.
    pub grade: ImageGrade,
    /// Visible to everyone.
    pub is_public: bool,
    /// Name of the uploading member.
    pub uploader_name: String,
}

impl DisplayMetadata {
    /// Defaults for a freshly staged file: public, general, no attribution.
    #[must_use]
    pub fn for_file(file: &SourceFile, uploader_name: Option<&str>) -> Self {
        Self {
            image_name: file.name.clone(),
            tags: Vec::new(),
            source: None,
            artist: None,
            grade: ImageGrade::default(),
            is_public: true,
            uploader_name: uploader_name.unwrap_or(GUEST_UPLOADER).to_string(),
        }
    }
}

/// One file of an upload batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUploadRecord {
    /// The file to upload.
    pub source_file: SourceFile,
    /// Local preview URL, unique within the batch.
    pub temporary_preview_url: String,
    /// Public URL, set once the transfer succeeds.
    pub permanent_url: Option<String>,
    /// Display metadata.
    pub metadata: DisplayMetadata,
}

impl AssetUploadRecord {
    /// Creates a staged record.
    #[must_use]
    pub fn staged(
        source_file: SourceFile,
        temporary_preview_url: String,
        uploader_name: Option<&str>,
    ) -> Self {
        let metadata = DisplayMetadata::for_file(&source_file, uploader_name);
        Self {
            source_file,
            temporary_preview_url,
            permanent_url: None,
            metadata,
        }
    }

    /// Returns true once the permanent URL is known.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        self.permanent_url.is_some()
    }

    /// Builds the metadata entry sent to the backend.
    ///
    /// Returns `None` while the record has no permanent URL.
    #[must_use]
    pub fn upload_entry(&self) -> Option<ImageUploadEntry> {
        let image_url = self.permanent_url.clone()?;
        Some(ImageUploadEntry {
            image_url,
            image_name: self.metadata.image_name.clone(),
            tags: self.metadata.tags.clone(),
            source: self.metadata.source.clone(),
            artist: self.metadata.artist.clone(),
            image_grade: self.metadata.grade.clone(),
            is_public: self.metadata.is_public,
            uploader_name: self.metadata.uploader_name.clone(),
            file_size: self.source_file.size(),
            file_type: self.source_file.mime_type.clone(),
        })
    }
}

/// Response of `GET /api/image/presigned-url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    /// Write-capable, time-limited storage URL.
    pub presigned_url: String,
    /// Public URL the object will be served from.
    pub image_url: String,
}

/// One element of the `POST /api/image/upload` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadEntry {
    /// Permanent URL.
    pub image_url: String,
    /// Display name.
    pub image_name: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Source attribution.
    pub source: Option<String>,
    /// Artist attribution.
    pub artist: Option<String>,
    /// Classification.
    pub image_grade: ImageGrade,
    /// Visibility.
    pub is_public: bool,
    /// Uploader.
    pub uploader_name: String,
    /// Size in bytes.
    pub file_size: u64,
    /// MIME type.
    pub file_type: String,
}

/// Temporary preview URL to permanent URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlMapping {
    entries: HashMap<String, String>,
}

impl UrlMapping {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `temporary` now lives at `permanent`.
    pub fn insert(&mut self, temporary: impl Into<String>, permanent: impl Into<String>) {
        self.entries.insert(temporary.into(), permanent.into());
    }

    /// Looks up the permanent URL for a preview URL.
    #[must_use]
    pub fn get(&self, temporary: &str) -> Option<&str> {
        self.entries.get(temporary).map(String::as_str)
    }

    /// Returns true if `temporary` has been mapped.
    #[must_use]
    pub fn contains(&self, temporary: &str) -> bool {
        self.entries.contains_key(temporary)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates over `(temporary, permanent)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replaces every occurrence of every mapped preview URL in `text`.
    ///
    /// Preview URLs are unique and never substrings of one another, so the
    /// order in which entries are applied does not matter.
    #[must_use]
    pub fn rewrite(&self, text: &str) -> String {
        self.entries
            .iter()
            .fold(text.to_string(), |content, (temporary, permanent)| {
                if content.contains(temporary.as_str()) {
                    content.replace(temporary.as_str(), permanent)
                } else {
                    content
                }
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_source_file_infers_mime() {
        assert_eq!(SourceFile::new("cat.png", vec![1]).mime_type, "image/png");
        assert_eq!(
            SourceFile::new("notes", vec![1]).mime_type,
            "application/octet-stream"
        );
        assert_eq!(
            SourceFile::new("x.bin", vec![1]).with_mime_type("image/webp").mime_type,
            "image/webp"
        );
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(SourceFile::new("a.png", vec![]).validate().is_err());
        assert!(SourceFile::new(" ", vec![1]).validate().is_err());
        assert!(SourceFile::new("a.png", vec![1]).validate().is_ok());
    }

    #[test]
    fn test_staged_defaults() {
        let record = AssetUploadRecord::staged(
            SourceFile::new("a.png", vec![1, 2, 3]),
            "blob:local/1".to_string(),
            None,
        );
        assert!(!record.is_committed());
        assert!(record.metadata.is_public);
        assert_eq!(record.metadata.grade.as_str(), "GENERAL");
        assert_eq!(record.metadata.uploader_name, GUEST_UPLOADER);
        assert!(record.metadata.source.is_none() && record.metadata.artist.is_none());
        assert!(record.upload_entry().is_none());
    }

    #[test]
    fn test_upload_entry_wire_shape() {
        let mut record = AssetUploadRecord::staged(
            SourceFile::new("a.png", vec![1, 2, 3]),
            "blob:local/1".to_string(),
            Some("alice"),
        );
        record.permanent_url = Some("https://cdn/a.png".to_string());
        record.metadata.tags.push(Tag::named("cat"));

        let json = serde_json::to_value(record.upload_entry().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "imageUrl": "https://cdn/a.png",
                "imageName": "a.png",
                "tags": [{"name": "cat"}],
                "source": null,
                "artist": null,
                "imageGrade": "GENERAL",
                "isPublic": true,
                "uploaderName": "alice",
                "fileSize": 3,
                "fileType": "image/png"
            })
        );
    }

    #[test]
    fn test_rewrite_replaces_all_occurrences() {
        let mut mapping = UrlMapping::new();
        mapping.insert("blob:local/a", "https://cdn/a.png");
        mapping.insert("blob:local/b", "https://cdn/b.png");

        let html = r#"<img src="blob:local/a"><img src="blob:local/b"><img src="blob:local/a"><a href="https://other">x</a>"#;
        let rewritten = mapping.rewrite(html);

        assert_eq!(
            rewritten,
            r#"<img src="https://cdn/a.png"><img src="https://cdn/b.png"><img src="https://cdn/a.png"><a href="https://other">x</a>"#
        );
        assert_eq!(mapping.rewrite(&rewritten), rewritten);
    }

    #[test]
    fn test_presigned_upload_wire_names() {
        let presigned: PresignedUpload = serde_json::from_str(
            r#"{"presignedUrl":"https://s3/put?sig=1","imageUrl":"https://cdn/a.png"}"#,
        )
        .unwrap();
        assert_eq!(presigned.image_url, "https://cdn/a.png");
    }
}
