//! Container duration probing
//!
//! Reads just enough of a container's header structures to find its declared
//! duration. Frame data is never decoded.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::errors::DomainError;
use crate::ports::DurationProbe;

pub mod matroska;
pub mod mp4;

/// Container families the prober understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// ISO base media file format (mp4, mov, m4v, 3gp)
    IsoBmff,
    /// Matroska and WebM
    Matroska,
}

impl ContainerKind {
    /// Identify the container from its leading bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&matroska::EBML_MAGIC) {
            return Some(ContainerKind::Matroska);
        }
        if mp4::looks_like_iso_bmff(bytes) {
            return Some(ContainerKind::IsoBmff);
        }
        None
    }
}

/// Probe the declared duration of a video held in memory
pub fn probe_duration(bytes: &[u8]) -> Result<f64, DomainError> {
    if bytes.is_empty() {
        return Err(DomainError::ProbeFail("file is empty".to_string()));
    }

    let kind = ContainerKind::sniff(bytes)
        .ok_or_else(|| DomainError::ProbeFail("unrecognized or unsupported container".to_string()))?;

    let duration = match kind {
        ContainerKind::IsoBmff => mp4::duration(bytes)?,
        ContainerKind::Matroska => matroska::duration(bytes)?,
    };

    if !duration.is_finite() || duration < 0.0 {
        return Err(DomainError::ProbeFail(format!(
            "container declares an invalid duration: {}",
            duration
        )));
    }

    debug!(?kind, duration, "Probed container duration");
    Ok(duration)
}

/// Header-only prober backed by [`probe_duration`]
#[derive(Debug, Default, Clone, Copy)]
pub struct ContainerProbe;

impl ContainerProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DurationProbe for ContainerProbe {
    async fn probe_duration(&self, bytes: &[u8]) -> Result<f64, DomainError> {
        probe_duration(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_matroska() {
        let bytes = [0x1A, 0x45, 0xDF, 0xA3, 0x80];
        assert_eq!(ContainerKind::sniff(&bytes), Some(ContainerKind::Matroska));
    }

    #[test]
    fn test_sniff_iso_bmff() {
        let bytes = mp4::tests::movie(600, 6000, false);
        assert_eq!(ContainerKind::sniff(&bytes), Some(ContainerKind::IsoBmff));
    }

    #[test]
    fn test_probe_rejects_garbage() {
        let err = probe_duration(b"definitely not a video").unwrap_err();
        assert!(matches!(err, DomainError::ProbeFail(_)));
    }

    #[test]
    fn test_probe_rejects_empty() {
        assert!(probe_duration(&[]).is_err());
    }

    #[tokio::test]
    async fn test_container_probe_port() {
        let bytes = mp4::tests::movie(1000, 10_000, false);
        let duration = ContainerProbe::new().probe_duration(&bytes).await.unwrap();
        assert!((duration - 10.0).abs() < 1e-9);
    }
}
