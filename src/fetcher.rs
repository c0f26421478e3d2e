//! Media transfer: plain HTTP downloads and transcoder-backed stream capture

use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Moves media bytes from the network onto disk
///
/// The acquisition pipeline decides which method applies to a track; implementations only
/// have to get bytes into `dest`. A failed call must not leave a partial file behind.
#[async_trait]
pub trait TrackFetcher: Send + Sync {
    /// Stream the body of `url` into `dest`, returning the number of bytes written
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;

    /// Decode a base64 stream descriptor and let the transcoder copy the audio into `dest`
    async fn transcode(&self, manifest: &str, dest: &Path) -> Result<()>;

    /// Name of the implementation, for logs
    fn name(&self) -> &'static str;
}

/// reqwest + ffmpeg implementation of [`TrackFetcher`]
pub struct HttpTrackFetcher {
    http: reqwest::Client,
    ffmpeg: Option<PathBuf>,
}

impl HttpTrackFetcher {
    /// Build a fetcher from the configuration
    ///
    /// Uses the configured ffmpeg path, or searches `PATH` when none is set. A missing
    /// ffmpeg only matters once a hi-res track has to be transcoded.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.catalog.timeout_secs))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        let ffmpeg = config
            .download
            .ffmpeg_path
            .clone()
            .or_else(|| which::which("ffmpeg").ok());

        match &ffmpeg {
            Some(path) => tracing::info!(ffmpeg = %path.display(), "transcoder available"),
            None => tracing::warn!("ffmpeg not found, hi-res tracks cannot be acquired"),
        }

        Ok(Self { http, ffmpeg })
    }

    async fn stream_to_file(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            return Err(Error::Other(format!(
                "{} returned HTTP {}",
                url,
                response.status().as_u16()
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

#[async_trait]
impl TrackFetcher for HttpTrackFetcher {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        match self.stream_to_file(url, dest).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                let _ = tokio::fs::remove_file(dest).await;
                Err(e)
            }
        }
    }

    async fn transcode(&self, manifest: &str, dest: &Path) -> Result<()> {
        let ffmpeg = self
            .ffmpeg
            .as_ref()
            .ok_or_else(|| Error::ExternalTool("ffmpeg not found in PATH".to_string()))?;

        let descriptor = BASE64
            .decode(manifest.trim())
            .map_err(|e| Error::Other(format!("stream descriptor is not base64: {}", e)))?;

        match run_transcoder(ffmpeg, &descriptor, dest).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = tokio::fs::remove_file(dest).await;
                Err(e)
            }
        }
    }

    fn name(&self) -> &'static str {
        "http-ffmpeg"
    }
}

/// Feed `descriptor` to ffmpeg on stdin and wait for it to write `dest`
///
/// stderr is collected on every path, including a broken stdin pipe.
async fn run_transcoder(ffmpeg: &Path, descriptor: &[u8], dest: &Path) -> Result<()> {
    let mut child = Command::new(ffmpeg)
        .args(["-y", "-loglevel", "error"])
        .args(["-protocol_whitelist", "file,http,https,tcp,tls,pipe"])
        .args(["-i", "pipe:", "-acodec", "copy"])
        .arg(dest)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::ExternalTool(format!("Failed to execute ffmpeg: {}", e)))?;

    // stdin is dropped at the end of the arm, closing the pipe
    let fed = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(descriptor).await,
        None => Ok(()),
    };

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| Error::ExternalTool(format!("ffmpeg did not finish: {}", e)))?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    if let Err(e) = fed {
        return Err(Error::ExternalTool(format!(
            "Failed to feed ffmpeg: {}: {}",
            e,
            stderr.trim()
        )));
    }

    if !output.status.success() {
        return Err(Error::ExternalTool(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}
