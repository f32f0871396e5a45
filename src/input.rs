//! Input normalisation: turn a caller's file handle into an upload part.
//!
//! A [`FileInput`] can be a path, an in-memory buffer, or any `Read`
//! implementation. [`prepare_file_input`] collapses all three into a
//! filename plus an [`UploadContent`]:
//!
//! * paths at or below [`STREAMING_THRESHOLD`] are read into memory;
//! * larger paths are opened and streamed, so a 2 GB scan never has to fit
//!   in RAM. The size check uses filesystem metadata only;
//! * readers are drained into a buffer, since their length is unknown.
//!
//! All checks happen here, before anything touches the network, so a
//! missing file fails fast with [`DwsError::FileNotFound`].
//!
//! Results are written back with [`save_file_output`], which writes to a
//! temp file in the target directory and renames it into place: a failed
//! write never leaves a truncated document behind.

use crate::error::DwsError;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Files strictly larger than this (10 MiB) are streamed instead of buffered.
pub const STREAMING_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Filename used when the input carries no name of its own.
pub const DEFAULT_FILENAME: &str = "document";

/// Content type attached to every uploaded file part.
pub const UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

/// A document supplied by the caller.
///
/// Built with `From` conversions for the common cases:
/// ```rust
/// use nutrient_dws::FileInput;
///
/// let a: FileInput = "report.docx".into();          // path
/// let b: FileInput = vec![0x25, 0x50, 0x44, 0x46].into(); // bytes
/// let c = FileInput::named_reader(std::io::empty(), "scan.pdf");
/// # let _ = (a, b, c);
/// ```
pub enum FileInput {
    /// A file on disk.
    Path(PathBuf),
    /// Raw document bytes; uploaded as [`DEFAULT_FILENAME`].
    Bytes(Vec<u8>),
    /// An open readable stream, drained on upload.
    Reader {
        reader: Box<dyn Read + Send>,
        name: Option<String>,
    },
}

impl FileInput {
    /// Wrap an anonymous reader.
    pub fn reader(reader: impl Read + Send + 'static) -> Self {
        FileInput::Reader {
            reader: Box::new(reader),
            name: None,
        }
    }

    /// Wrap a reader whose upload filename should be `name`.
    pub fn named_reader(reader: impl Read + Send + 'static, name: impl Into<String>) -> Self {
        FileInput::Reader {
            reader: Box::new(reader),
            name: Some(name.into()),
        }
    }
}

impl fmt::Debug for FileInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileInput::Path(p) => f.debug_tuple("Path").field(p).finish(),
            FileInput::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            FileInput::Reader { name, .. } => f
                .debug_struct("Reader")
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

impl From<&str> for FileInput {
    fn from(s: &str) -> Self {
        FileInput::Path(PathBuf::from(s))
    }
}

impl From<String> for FileInput {
    fn from(s: String) -> Self {
        FileInput::Path(PathBuf::from(s))
    }
}

impl From<&Path> for FileInput {
    fn from(p: &Path) -> Self {
        FileInput::Path(p.to_path_buf())
    }
}

impl From<PathBuf> for FileInput {
    fn from(p: PathBuf) -> Self {
        FileInput::Path(p)
    }
}

impl From<Vec<u8>> for FileInput {
    fn from(b: Vec<u8>) -> Self {
        FileInput::Bytes(b)
    }
}

impl From<&[u8]> for FileInput {
    fn from(b: &[u8]) -> Self {
        FileInput::Bytes(b.to_vec())
    }
}

impl From<File> for FileInput {
    fn from(f: File) -> Self {
        FileInput::reader(f)
    }
}

/// Upload-ready document content.
#[derive(Debug)]
pub enum UploadContent {
    /// Fully materialised bytes.
    Bytes(Vec<u8>),
    /// An open handle on a large file, plus its length from metadata.
    Stream { file: File, len: u64 },
}

impl UploadContent {
    /// Content length in bytes.
    pub fn len(&self) -> u64 {
        match self {
            UploadContent::Bytes(b) => b.len() as u64,
            UploadContent::Stream { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, UploadContent::Stream { .. })
    }

    /// Duplicate the content for another request.
    ///
    /// A stream clone shares the OS handle (and its cursor) with the original.
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(match self {
            UploadContent::Bytes(b) => UploadContent::Bytes(b.clone()),
            UploadContent::Stream { file, len } => UploadContent::Stream {
                file: file.try_clone()?,
                len: *len,
            },
        })
    }

    /// A fresh handle positioned at the start, for one upload attempt.
    pub(crate) fn rewound_stream(file: &File) -> io::Result<File> {
        let mut handle = file.try_clone()?;
        handle.seek(SeekFrom::Start(0))?;
        Ok(handle)
    }
}

/// Output of [`prepare_file_input`].
#[derive(Debug)]
pub struct PreparedFile {
    pub filename: String,
    pub content: UploadContent,
}

/// One named file field in a multipart request.
#[derive(Debug)]
pub struct UploadPart {
    pub field_name: String,
    pub filename: String,
    pub content: UploadContent,
    pub content_type: String,
}

impl UploadPart {
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(UploadPart {
            field_name: self.field_name.clone(),
            filename: self.filename.clone(),
            content: self.content.try_clone()?,
            content_type: self.content_type.clone(),
        })
    }
}

/// Normalise a [`FileInput`] into a filename and upload content.
///
/// # Errors
/// - [`DwsError::FileNotFound`] — the path does not exist
/// - [`DwsError::UnsupportedInput`] — the path is not a regular file
/// - [`DwsError::FileProcessing`] — reading failed
pub fn prepare_file_input(input: FileInput) -> Result<PreparedFile, DwsError> {
    match input {
        FileInput::Path(path) => prepare_path(path),
        FileInput::Bytes(bytes) => Ok(PreparedFile {
            filename: DEFAULT_FILENAME.to_string(),
            content: UploadContent::Bytes(bytes),
        }),
        FileInput::Reader { mut reader, name } => {
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .map_err(|e| DwsError::FileProcessing {
                    path: PathBuf::from(name.as_deref().unwrap_or("<stream>")),
                    source: e,
                })?;
            let filename = name
                .as_deref()
                .and_then(|n| Path::new(n).file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
            debug!("Drained stream '{}' ({} bytes)", filename, buf.len());
            Ok(PreparedFile {
                filename,
                content: UploadContent::Bytes(buf),
            })
        }
    }
}

/// Normalise `input` and label it with a multipart field name.
pub fn prepare_file_for_upload(input: FileInput, field_name: &str) -> Result<UploadPart, DwsError> {
    let prepared = prepare_file_input(input)?;
    Ok(UploadPart {
        field_name: field_name.to_string(),
        filename: prepared.filename,
        content: prepared.content,
        content_type: UPLOAD_CONTENT_TYPE.to_string(),
    })
}

fn prepare_path(path: PathBuf) -> Result<PreparedFile, DwsError> {
    let meta = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DwsError::FileNotFound { path });
        }
        Err(e) => return Err(DwsError::FileProcessing { path, source: e }),
    };

    if !meta.is_file() {
        return Err(DwsError::UnsupportedInput {
            detail: format!("'{}' is not a regular file", path.display()),
        });
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

    let len = meta.len();
    let content = if len > STREAMING_THRESHOLD {
        let file = File::open(&path).map_err(|e| DwsError::FileProcessing {
            path: path.clone(),
            source: e,
        })?;
        debug!("Streaming {} ({} bytes)", path.display(), len);
        UploadContent::Stream { file, len }
    } else {
        let bytes = std::fs::read(&path).map_err(|e| DwsError::FileProcessing {
            path: path.clone(),
            source: e,
        })?;
        debug!("Buffered {} ({} bytes)", path.display(), bytes.len());
        UploadContent::Bytes(bytes)
    };

    Ok(PreparedFile { filename, content })
}

/// Size of the input in bytes, when it can be known without consuming it.
pub fn get_file_size(input: &FileInput) -> Option<u64> {
    match input {
        FileInput::Path(p) => std::fs::metadata(p).ok().map(|m| m.len()),
        FileInput::Bytes(b) => Some(b.len() as u64),
        FileInput::Reader { .. } => None,
    }
}

/// Write `content` to `output_path`, creating parent directories.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub fn save_file_output(content: &[u8], output_path: &Path) -> Result<(), DwsError> {
    let write_err = |e: io::Error| DwsError::FileProcessing {
        path: output_path.to_path_buf(),
        source: e,
    };

    let parent = match output_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(content).map_err(write_err)?;
    tmp.persist(output_path).map_err(|e| write_err(e.error))?;

    debug!("Wrote {} bytes to {}", content.len(), output_path.display());
    Ok(())
}
