//! FFmpeg process engine adapter
//!
//! Implements the engine contract by staging an `ffmpeg` executable (the
//! execution core) and `ffprobe` (the computation module) into a private
//! directory, then running the staged core inside a private workspace
//! directory. Progress comes from ffmpeg's `-progress pipe:1` key/value stream.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::errors::DomainError;
use crate::ports::{EngineLoader, EngineWorkspace, ProgressObserver};

/// Arguments prepended to every invocation
const BASE_ARGS: [&str; 8] = [
    "-hide_banner",
    "-nostdin",
    "-y",
    "-loglevel",
    "error",
    "-progress",
    "pipe:1",
    "-nostats",
];

/// Lines of stderr kept for error messages
const STDERR_TAIL_LINES: usize = 8;

const READ_CHUNK: usize = 256 * 1024;

/// Which of the two engine assets is being acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Core,
    Module,
}

impl AssetKind {
    fn staged_name(self) -> &'static str {
        match (self, cfg!(windows)) {
            (AssetKind::Core, false) => "engine-core",
            (AssetKind::Core, true) => "engine-core.exe",
            (AssetKind::Module, false) => "engine-module",
            (AssetKind::Module, true) => "engine-module.exe",
        }
    }
}

/// Loads the ffmpeg process engine from configured asset locations
#[derive(Debug, Clone)]
pub struct FfmpegEngineLoader {
    core: String,
    module: String,
}

impl FfmpegEngineLoader {
    /// Create new loader; bare names are looked up on `PATH`
    pub fn new(core: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            core: core.into(),
            module: module.into(),
        }
    }

    /// Resolve an asset location to an existing file
    pub fn resolve(location: &str) -> Result<PathBuf, DomainError> {
        let candidate = Path::new(location);
        if candidate.components().count() > 1 || candidate.is_absolute() {
            return if candidate.is_file() {
                Ok(candidate.to_path_buf())
            } else {
                Err(DomainError::AssetFail(format!("{} does not exist", location)))
            };
        }

        let path_var = std::env::var_os("PATH").unwrap_or_default();
        std::env::split_paths(&path_var)
            .flat_map(|dir| {
                let plain = dir.join(location);
                let exe = dir.join(format!("{}.exe", location));
                [plain, exe]
            })
            .find(|path| path.is_file())
            .ok_or_else(|| DomainError::AssetFail(format!("{} was not found on PATH", location)))
    }

    /// Copy one asset into the staging directory, reporting byte progress
    async fn stage_asset(
        &self,
        kind: AssetKind,
        staging: &Path,
        observer: &dyn ProgressObserver,
        base: f64,
    ) -> Result<PathBuf, DomainError> {
        let location = match kind {
            AssetKind::Core => &self.core,
            AssetKind::Module => &self.module,
        };
        let source = Self::resolve(location)?;
        let fail = |e: std::io::Error| DomainError::AssetFail(format!("{}: {}", source.display(), e));

        let mut reader = tokio::fs::File::open(&source).await.map_err(fail)?;
        let total = reader.metadata().await.map_err(fail)?.len().max(1);
        let target = staging.join(kind.staged_name());
        let mut writer = tokio::fs::File::create(&target).await.map_err(fail)?;

        let mut buffer = vec![0u8; READ_CHUNK];
        let mut copied = 0u64;
        loop {
            let n = reader.read(&mut buffer).await.map_err(fail)?;
            if n == 0 {
                break;
            }
            writer.write_all(&buffer[..n]).await.map_err(fail)?;
            copied += n as u64;
            // each asset owns half of the load window
            observer.on_progress(base + 0.5 * (copied as f64 / total as f64).min(1.0));
        }
        writer.flush().await.map_err(fail)?;
        drop(writer);

        make_executable(&target).await?;
        debug!(asset = ?kind, from = %source.display(), to = %target.display(), bytes = copied, "Staged engine asset");
        Ok(target)
    }
}

#[async_trait]
impl EngineLoader for FfmpegEngineLoader {
    async fn load(&self, observer: &dyn ProgressObserver) -> Result<Arc<dyn EngineWorkspace>, DomainError> {
        let staging = tempfile::Builder::new()
            .prefix("tailtrim-engine-")
            .tempdir()
            .map_err(|e| DomainError::AssetFail(format!("cannot create staging directory: {}", e)))?;

        let core = self.stage_asset(AssetKind::Core, staging.path(), observer, 0.0).await?;
        let module = self.stage_asset(AssetKind::Module, staging.path(), observer, 0.5).await?;

        handshake(&core).await?;
        handshake(&module).await?;

        let workspace = tempfile::Builder::new()
            .prefix("tailtrim-workspace-")
            .tempdir()
            .map_err(|e| DomainError::AssetFail(format!("cannot create workspace: {}", e)))?;
        info!(workspace = %workspace.path().display(), "FFmpeg engine instantiated");

        Ok(Arc::new(FfmpegWorkspace {
            core,
            dir: workspace,
            _assets: staging,
        }))
    }
}

/// Confirm a staged binary runs
async fn handshake(binary: &Path) -> Result<(), DomainError> {
    let output = Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| DomainError::AssetFail(format!("{} cannot be started: {}", binary.display(), e)))?;

    if !output.status.success() {
        return Err(DomainError::AssetFail(format!(
            "{} -version exited with {}",
            binary.display(),
            output.status
        )));
    }

    let banner = String::from_utf8_lossy(&output.stdout);
    debug!(binary = %binary.display(), version = %banner.lines().next().unwrap_or_default(), "Engine handshake ok");
    Ok(())
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<(), DomainError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|e| DomainError::AssetFail(format!("cannot mark {} executable: {}", path.display(), e)))
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<(), DomainError> {
    Ok(())
}

/// Private workspace directory driven by a staged ffmpeg
pub struct FfmpegWorkspace {
    core: PathBuf,
    dir: TempDir,
    _assets: TempDir,
}

impl FfmpegWorkspace {
    /// Path of the workspace directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Map an entry name into the workspace; the namespace is flat
    fn entry(&self, name: &str) -> Result<PathBuf, DomainError> {
        let flat = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.starts_with('-');
        if !flat {
            return Err(DomainError::WorkspaceFail(format!("invalid entry name '{}'", name)));
        }
        Ok(self.dir.path().join(name))
    }
}

#[async_trait]
impl EngineWorkspace for FfmpegWorkspace {
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), DomainError> {
        let path = self.entry(name)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DomainError::WorkspaceFail(format!("cannot write {}: {}", name, e)))
    }

    async fn invoke(&self, args: &[String], observer: &dyn ProgressObserver) -> Result<(), DomainError> {
        let total = time_limit(args);
        debug!(?args, "Invoking ffmpeg");

        let mut child = Command::new(&self.core)
            .current_dir(self.dir.path())
            .args(BASE_ARGS)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DomainError::InvocationFail(format!("cannot start engine: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DomainError::InvocationFail("engine stdout unavailable".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DomainError::InvocationFail("engine stderr unavailable".to_string()))?;

        let progress = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(fraction) = parse_progress_line(&line, total) {
                    observer.on_progress(fraction);
                }
            }
            Ok::<_, std::io::Error>(())
        };
        let diagnostics = async {
            let mut buffer = Vec::new();
            stderr.read_to_end(&mut buffer).await?;
            Ok::<_, std::io::Error>(String::from_utf8_lossy(&buffer).into_owned())
        };

        let (progress, diagnostics) = tokio::join!(progress, diagnostics);
        let status = child
            .wait()
            .await
            .map_err(|e| DomainError::InvocationFail(format!("engine did not finish: {}", e)))?;
        progress.map_err(|e| DomainError::InvocationFail(format!("progress stream: {}", e)))?;
        let diagnostics = diagnostics.unwrap_or_default();

        if !status.success() {
            return Err(DomainError::InvocationFail(format!(
                "engine exited with {}: {}",
                status,
                stderr_tail(&diagnostics)
            )));
        }
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>, DomainError> {
        let path = self.entry(name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| DomainError::WorkspaceFail(format!("cannot read {}: {}", name, e)))
    }

    async fn remove(&self, name: &str) -> Result<(), DomainError> {
        let path = self.entry(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::WorkspaceFail(format!("cannot remove {}: {}", name, e))),
        }
    }
}

/// Value of the `-t` argument, the expected output length
fn time_limit(args: &[String]) -> Option<f64> {
    args.windows(2)
        .find(|pair| pair[0] == "-t")
        .and_then(|pair| pair[1].parse::<f64>().ok())
        .filter(|limit| *limit > 0.0)
}

/// Convert one `-progress` line into a fraction of `total`
pub fn parse_progress_line(line: &str, total: Option<f64>) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "progress" if value == "end" => Some(1.0),
        // out_time_ms is in microseconds as well
        "out_time_us" | "out_time_ms" => {
            let micros = value.parse::<i64>().ok()?;
            let total = total?;
            Some((micros as f64 / 1_000_000.0 / total).clamp(0.0, 1.0))
        }
        _ => None,
    }
}

fn stderr_tail(diagnostics: &str) -> String {
    let lines: Vec<&str> = diagnostics
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return "no diagnostics".to_string();
    }
    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("; ")
}
