//! File upload arguments.

use maas_core::{Error, Result};
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Arguments for [`Controller::add_file`](crate::Controller::add_file).
///
/// Exactly one of in-memory content or a reader with a length must be given.
pub struct AddFileArgs {
    /// Name the file is stored under; must not contain a directory part
    pub filename: String,
    /// In-memory content
    pub content: Option<Vec<u8>>,
    /// Streamed content, read up to `length` bytes
    pub reader: Option<Box<dyn AsyncRead + Send + Unpin>>,
    /// Number of bytes to read from `reader`
    pub length: u64,
}

impl fmt::Debug for AddFileArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddFileArgs")
            .field("filename", &self.filename)
            .field("content", &self.content.as_ref().map(Vec::len))
            .field("reader", &self.reader.is_some())
            .field("length", &self.length)
            .finish()
    }
}

impl AddFileArgs {
    /// Upload in-memory content.
    #[must_use]
    pub fn from_content(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content: Some(content),
            reader: None,
            length: 0,
        }
    }

    /// Upload up to `length` bytes read from `reader`.
    #[must_use]
    pub fn from_reader<R>(filename: impl Into<String>, reader: R, length: u64) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            filename: filename.into(),
            content: None,
            reader: Some(Box::new(reader)),
            length,
        }
    }

    /// Check the filename and that exactly one content source is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.filename.contains('/') {
            return Err(Error::NotValid(format!(
                "paths in Filename {:?}",
                self.filename
            )));
        }
        if self.filename.is_empty() {
            return Err(not_valid("missing Filename"));
        }
        match (&self.content, &self.reader) {
            (None, None) => Err(not_valid("missing Content or Reader")),
            (None, Some(_)) if self.length == 0 => Err(not_valid("missing Length")),
            (Some(_), Some(_)) => Err(not_valid("specifying Content and Reader")),
            (Some(_), None) if self.length != 0 => {
                Err(not_valid("specifying Length and Content"))
            }
            _ => Ok(()),
        }
    }

    /// Validate and materialize the upload as a filename and bytes.
    pub(crate) async fn into_upload(self) -> Result<(String, Vec<u8>)> {
        self.validate()?;
        let content = match (self.content, self.reader) {
            (Some(content), _) => content,
            (None, Some(reader)) => {
                let mut buf = Vec::new();
                reader
                    .take(self.length)
                    .read_to_end(&mut buf)
                    .await
                    .map_err(|err| Error::io("cannot read file content", err))?;
                buf
            }
            (None, None) => return Err(not_valid("missing Content or Reader")),
        };
        Ok((self.filename, content))
    }
}

fn not_valid(message: &str) -> Error {
    Error::NotValid(message.to_string())
}
