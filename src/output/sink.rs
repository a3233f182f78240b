//! Local output destination

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};

use super::framing::{Emission, FramingMode};
use crate::config::ConfigError;
use crate::error::{Error, Result};

/// Where framed output goes
#[derive(Debug)]
pub enum OutputSink {
    /// No local output
    None,
    /// Standard output
    Stdout(Stdout),
    /// A file opened once and appended to
    File { file: File, path: PathBuf },
    /// A file replaced on every frame via a temporary sibling
    Replace { path: PathBuf, tmp: PathBuf },
}

impl OutputSink {
    /// Open the output named by the `output` option
    ///
    /// Empty means none and `-` means stdout. Replace framing needs a real
    /// path to rename over.
    pub async fn open(output: &str, mode: FramingMode) -> Result<Self> {
        match output {
            "" => Ok(OutputSink::None),
            "-" if mode == FramingMode::ReplaceFile => Err(ConfigError::Conflict(
                "Cannot use 'replace' framing with stdout",
            )
            .into()),
            "-" => Ok(OutputSink::Stdout(tokio::io::stdout())),
            path if mode == FramingMode::ReplaceFile => {
                let path = PathBuf::from(path);
                let tmp = tmp_path(&path);
                Ok(OutputSink::Replace { path, tmp })
            }
            path => {
                let path = PathBuf::from(path);
                let file = File::create(&path)
                    .await
                    .map_err(|e| Error::sink(&path, e))?;
                Ok(OutputSink::File { file, path })
            }
        }
    }

    /// Whether there is no local output
    pub fn is_none(&self) -> bool {
        matches!(self, OutputSink::None)
    }

    /// Display name for diagnostics
    pub fn path(&self) -> &Path {
        match self {
            OutputSink::None => Path::new(""),
            OutputSink::Stdout(_) => Path::new("-"),
            OutputSink::File { path, .. } | OutputSink::Replace { path, .. } => path,
        }
    }

    /// Append parts to the output
    ///
    /// A replace sink has no stream to append to, so the parts become the
    /// new file contents.
    pub async fn write_parts(&mut self, parts: &[Bytes]) -> Result<()> {
        match self {
            OutputSink::None => Ok(()),
            OutputSink::Stdout(out) => write_all(out, parts, Path::new("-")).await,
            OutputSink::File { file, path } => write_all(file, parts, path).await,
            OutputSink::Replace { path, tmp } => replace(path, tmp, &parts.concat()).await,
        }
    }

    /// Write one emission
    pub async fn write(&mut self, emission: &Emission) -> Result<()> {
        match emission {
            Emission::Skip => Ok(()),
            Emission::Write(parts) => self.write_parts(parts).await,
            Emission::ReplaceFile(data) => match self {
                OutputSink::None => Ok(()),
                OutputSink::Stdout(out) => {
                    write_all(out, std::slice::from_ref(data), Path::new("-")).await
                }
                OutputSink::File { path, .. } => {
                    let tmp = tmp_path(path);
                    replace(path, &tmp, data).await
                }
                OutputSink::Replace { path, tmp } => replace(path, tmp, data).await,
            },
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

async fn write_all<W>(out: &mut W, parts: &[Bytes], path: &Path) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    for part in parts {
        out.write_all(part).await.map_err(|e| Error::sink(path, e))?;
    }
    out.flush().await.map_err(|e| Error::sink(path, e))
}

async fn replace(path: &Path, tmp: &Path, data: &[u8]) -> Result<()> {
    tokio::fs::write(tmp, data)
        .await
        .map_err(|e| Error::sink(tmp, e))?;
    tokio::fs::rename(tmp, path)
        .await
        .map_err(|e| Error::sink(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_none() {
        let mut sink = OutputSink::open("", FramingMode::Concatenate).await.unwrap();

        assert!(sink.is_none());
        sink.write(&Emission::Write(vec![Bytes::from_static(b"abc")]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_replace_with_stdout_is_rejected() {
        let err = OutputSink::open("-", FramingMode::ReplaceFile).await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_file_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mjpeg");
        let mut sink = OutputSink::open(path.to_str().unwrap(), FramingMode::Concatenate)
            .await
            .unwrap();

        sink.write_parts(&[Bytes::from_static(b"ab")]).await.unwrap();
        sink.write(&Emission::Write(vec![
            Bytes::from_static(b"cd"),
            Bytes::from_static(b"ef"),
        ]))
        .await
        .unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"abcdef");
        assert_eq!(sink.path(), path);
    }

    #[tokio::test]
    async fn test_replace_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.jpg");
        let mut sink = OutputSink::open(path.to_str().unwrap(), FramingMode::ReplaceFile)
            .await
            .unwrap();

        sink.write(&Emission::ReplaceFile(Bytes::from_static(b"first")))
            .await
            .unwrap();
        sink.write(&Emission::ReplaceFile(Bytes::from_static(b"second")))
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"second");
        assert!(!dir.path().join("latest.jpg.tmp").exists());
    }

    #[tokio::test]
    async fn test_replace_on_appending_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        let mut sink = OutputSink::open(path.to_str().unwrap(), FramingMode::Concatenate)
            .await
            .unwrap();

        sink.write(&Emission::ReplaceFile(Bytes::from_static(b"frame")))
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"frame");
    }

    #[tokio::test]
    async fn test_write_failure_is_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("latest.jpg");
        let mut sink = OutputSink::open(path.to_str().unwrap(), FramingMode::ReplaceFile)
            .await
            .unwrap();

        let err = sink
            .write(&Emission::ReplaceFile(Bytes::from_static(b"x")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Sink { .. }));
    }
}
