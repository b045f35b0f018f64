//! Derives the remote base URL and local folder from a sample link.
//!
//! Given any one file of the range, e.g. `https://host/book/0064.png`, every
//! other file lives next to it: `https://host/book/<label>.<ext>`. Files are
//! saved into a folder named after the last directory segment (`book`), or
//! `downloads` when the sample sits at the server root.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use url::Url;

/// Folder used when the sample link has no directory segment.
pub const FALLBACK_FOLDER: &str = "downloads";

/// Errors raised while interpreting the sample link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The link does not use an HTTP(S) scheme.
    #[error("url must start with http/https: {url}")]
    NotHttp {
        /// The rejected link.
        url: String,
    },

    /// The link could not be parsed.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The rejected link.
        url: String,
        /// Parser message.
        reason: String,
    },
}

/// Where files come from and where they go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    base_url: String,
    folder: PathBuf,
    extension: String,
}

impl SourceLayout {
    /// Builds a layout from a sample link, placing the folder under `output_root`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NotHttp`] for non-HTTP links and
    /// [`LayoutError::InvalidUrl`] when the link does not parse.
    pub fn from_sample_url(
        sample: &str,
        output_root: &Path,
        extension: &str,
    ) -> Result<Self, LayoutError> {
        let parsed = Url::parse(sample).map_err(|e| LayoutError::InvalidUrl {
            url: sample.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LayoutError::NotHttp {
                url: sample.to_string(),
            });
        }

        let dir = parsed
            .path()
            .rsplit_once('/')
            .map_or("", |(dir, _file)| dir);
        let folder = dir
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .map_or(Cow::Borrowed(FALLBACK_FOLDER), decode_segment);

        let mut base = parsed.clone();
        base.set_query(None);
        base.set_fragment(None);
        base.set_path(&format!("{dir}/"));

        Ok(Self::new(
            base.as_str(),
            output_root.join(folder.as_ref()),
            extension,
        ))
    }

    /// Builds a layout from explicit parts. `base_url` must end with `/`.
    #[must_use]
    pub fn new(base_url: &str, folder: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            folder: folder.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Directory URL that every label is appended to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Local folder files are saved into.
    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// File extension, without the dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Remote URL for a label.
    #[must_use]
    pub fn url_for(&self, label: &str) -> String {
        format!("{}{}", self.base_url, self.file_name(label))
    }

    /// Local destination for a label.
    #[must_use]
    pub fn path_for(&self, label: &str) -> PathBuf {
        self.folder.join(self.file_name(label))
    }

    fn file_name(&self, label: &str) -> String {
        format!("{label}.{}", self.extension)
    }
}

/// Percent-decodes a path segment for use as a folder name.
///
/// A segment that does not decode to UTF-8, or that would decode into a
/// separator or a `.`/`..` component, is kept as sent.
fn decode_segment(segment: &str) -> Cow<'_, str> {
    match urlencoding::decode(segment) {
        Ok(decoded) if is_plain_component(&decoded) => decoded,
        Ok(decoded) => {
            debug!(segment, decoded = %decoded, "decoded folder segment is not a plain name, keeping it encoded");
            Cow::Borrowed(segment)
        }
        Err(e) => {
            debug!(segment, error = %e, "folder segment is not UTF-8 once decoded, keeping it encoded");
            Cow::Borrowed(segment)
        }
    }
}

fn is_plain_component(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
