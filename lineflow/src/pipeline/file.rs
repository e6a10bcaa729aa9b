//! File sources and sinks.

use super::{codec, ByteStream};
use crate::errors::{LineflowError, LineflowResult};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const FILE_CHUNK_SIZE: usize = 8192;

/// Lazily opens `path` and streams its contents.
///
/// An open failure surfaces as the stream's first item.
pub(crate) fn file_stream(path: PathBuf) -> ByteStream {
    stream::once(async move {
        let file = tokio::fs::File::open(&path).await?;
        debug!(path = %path.display(), "Opened file source");
        Ok::<_, LineflowError>(codec::reader_stream(file, FILE_CHUNK_SIZE))
    })
    .try_flatten()
    .boxed()
}

/// Writes every chunk of `bytes` into `path`.
///
/// `append` opens in append mode; otherwise the file is created or truncated.
/// The handle is flushed and released before this returns, on success or
/// failure.
pub(crate) async fn write_stream(
    mut bytes: ByteStream,
    path: &Path,
    append: bool,
) -> LineflowResult<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true);
    if append {
        options.append(true);
    } else {
        options.truncate(true);
    }

    let mut file = options.open(path).await?;
    let mut written = 0usize;
    while let Some(chunk) = bytes.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;

    debug!(path = %path.display(), append, bytes = written, "Wrote file sink");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bytes(parts: &[&str]) -> ByteStream {
        let owned: Vec<_> = parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(owned).boxed()
    }

    #[tokio::test]
    async fn test_truncate_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        write_stream(bytes(&["old content"]), &path, false).await.unwrap();
        write_stream(bytes(&["a\n"]), &path, false).await.unwrap();
        write_stream(bytes(&["b\n"]), &path, true).await.unwrap();

        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "a\nb\n");
    }

    #[tokio::test]
    async fn test_missing_file_fails_lazily() {
        let mut source = file_stream(PathBuf::from("/nonexistent/lineflow/input.txt"));
        assert!(matches!(source.next().await, Some(Err(LineflowError::Io(_)))));
    }

    #[tokio::test]
    async fn test_file_stream_reads_contents() {
        let file = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), "x\ny\n").await.unwrap();

        let text = codec::collect_text(file_stream(file.path().to_path_buf())).await.unwrap();
        assert_eq!(text, "x\ny\n");
    }
}
