//! Matroska/WebM duration reader
//!
//! Walks EBML elements down to `Segment/Info` and reads `TimecodeScale` and
//! `Duration`. Stops at the first `Cluster` since Info always precedes media.

use crate::domain::errors::DomainError;

/// EBML header element ID, also the file's magic bytes
pub const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

const EBML_HEADER: u32 = 0x1A45_DFA3;
const SEGMENT: u32 = 0x1853_8067;
const INFO: u32 = 0x1549_A966;
const CLUSTER: u32 = 0x1F43_B675;
const TIMECODE_SCALE: u32 = 0x2A_D7B1;
const DURATION: u32 = 0x4489;

const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

#[derive(Debug, Clone, Copy)]
struct Element {
    id: u32,
    data_start: usize,
    data_end: usize,
    unknown_size: bool,
}

/// Segment duration in seconds
pub fn duration(bytes: &[u8]) -> Result<f64, DomainError> {
    let header = read_element(bytes, 0, bytes.len())?
        .filter(|el| el.id == EBML_HEADER)
        .ok_or_else(|| DomainError::ProbeFail("missing EBML header".to_string()))?;
    if header.unknown_size {
        return Err(DomainError::ProbeFail("EBML header has unknown size".to_string()));
    }

    let mut offset = header.data_end;
    let segment = loop {
        match read_element(bytes, offset, bytes.len())? {
            Some(el) if el.id == SEGMENT => break el,
            Some(el) if !el.unknown_size && el.data_end > offset => offset = el.data_end,
            _ => return Err(DomainError::ProbeFail("no Segment element found".to_string())),
        }
    };

    let mut offset = segment.data_start;
    while let Some(child) = read_element(bytes, offset, segment.data_end)? {
        match child.id {
            INFO => return parse_info(bytes, &child),
            CLUSTER => {
                return Err(DomainError::ProbeFail(
                    "media clusters start before segment info".to_string(),
                ))
            }
            _ if child.unknown_size => {
                return Err(DomainError::ProbeFail(
                    "element of unknown size before segment info".to_string(),
                ))
            }
            _ => {}
        }
        if child.data_end <= offset {
            break;
        }
        offset = child.data_end;
    }

    Err(DomainError::ProbeFail("segment info not found".to_string()))
}

fn parse_info(bytes: &[u8], info: &Element) -> Result<f64, DomainError> {
    let mut scale = DEFAULT_TIMECODE_SCALE;
    let mut ticks = None;

    let mut offset = info.data_start;
    while let Some(child) = read_element(bytes, offset, info.data_end)? {
        let data = &bytes[child.data_start..child.data_end];
        match child.id {
            TIMECODE_SCALE => scale = read_uint(data)?,
            DURATION => ticks = Some(read_float(data)?),
            _ => {}
        }
        if child.data_end <= offset {
            break;
        }
        offset = child.data_end;
    }

    let ticks =
        ticks.ok_or_else(|| DomainError::ProbeFail("segment declares no duration".to_string()))?;
    if scale == 0 {
        return Err(DomainError::ProbeFail("timecode scale is zero".to_string()));
    }

    Ok(ticks * scale as f64 / 1e9)
}

fn read_element(bytes: &[u8], offset: usize, limit: usize) -> Result<Option<Element>, DomainError> {
    let limit = limit.min(bytes.len());
    if offset >= limit {
        return Ok(None);
    }

    let (id, id_len) = read_id(&bytes[offset..limit])?;
    let (size, size_len) = read_size(&bytes[offset + id_len..limit])?;
    let data_start = offset + id_len + size_len;

    let (data_end, unknown_size) = match size {
        None => (limit, true),
        Some(size) => {
            let end = usize::try_from(size)
                .ok()
                .and_then(|size| data_start.checked_add(size))
                .map_or(limit, |end| end.min(limit));
            (end, false)
        }
    };

    Ok(Some(Element {
        id,
        data_start,
        data_end,
        unknown_size,
    }))
}

fn read_id(bytes: &[u8]) -> Result<(u32, usize), DomainError> {
    let first = *bytes
        .first()
        .ok_or_else(|| DomainError::ProbeFail("truncated element id".to_string()))?;
    let len = first.leading_zeros() as usize + 1;
    if first == 0 || len > 4 || bytes.len() < len {
        return Err(DomainError::ProbeFail("invalid element id".to_string()));
    }
    let id = bytes[..len]
        .iter()
        .fold(0u32, |acc, &b| (acc << 8) | b as u32);
    Ok((id, len))
}

/// Element data size; `None` for the reserved "unknown size" encoding
fn read_size(bytes: &[u8]) -> Result<(Option<u64>, usize), DomainError> {
    let first = *bytes
        .first()
        .ok_or_else(|| DomainError::ProbeFail("truncated element size".to_string()))?;
    let len = first.leading_zeros() as usize + 1;
    if first == 0 || len > 8 || bytes.len() < len {
        return Err(DomainError::ProbeFail("invalid element size".to_string()));
    }

    let marker_mask = if len == 8 { 0 } else { 0xFFu8 >> len };
    let mut value = (first & marker_mask) as u64;
    for &b in &bytes[1..len] {
        value = (value << 8) | b as u64;
    }

    let all_ones = (1u64 << (7 * len)) - 1;
    if value == all_ones {
        return Ok((None, len));
    }
    Ok((Some(value), len))
}

fn read_uint(data: &[u8]) -> Result<u64, DomainError> {
    if data.is_empty() || data.len() > 8 {
        return Err(DomainError::ProbeFail(format!(
            "invalid unsigned integer of {} bytes",
            data.len()
        )));
    }
    Ok(data.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

fn read_float(data: &[u8]) -> Result<f64, DomainError> {
    match data.len() {
        4 => {
            let raw: [u8; 4] = data
                .try_into()
                .map_err(|_| DomainError::ProbeFail("invalid float".to_string()))?;
            Ok(f32::from_be_bytes(raw) as f64)
        }
        8 => {
            let raw: [u8; 8] = data
                .try_into()
                .map_err(|_| DomainError::ProbeFail("invalid float".to_string()))?;
            Ok(f64::from_be_bytes(raw))
        }
        n => Err(DomainError::ProbeFail(format!("invalid float of {} bytes", n))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn id_bytes(id: u32) -> Vec<u8> {
        id.to_be_bytes()
            .iter()
            .copied()
            .skip_while(|&b| b == 0)
            .collect()
    }

    pub(crate) fn element(id: u32, data: &[u8]) -> Vec<u8> {
        let mut out = id_bytes(id);
        // 8-byte size vint keeps the helper valid for any payload length
        out.push(0x01);
        out.extend_from_slice(&(data.len() as u64).to_be_bytes()[1..]);
        out.extend_from_slice(data);
        out
    }

    fn unknown_size_segment(children: &[u8]) -> Vec<u8> {
        let mut out = id_bytes(SEGMENT);
        out.extend_from_slice(&[0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        out.extend_from_slice(children);
        out
    }

    /// Minimal WebM with a float64 duration in milliseconds
    pub(crate) fn webm(duration_ms: f64) -> Vec<u8> {
        let mut out = element(EBML_HEADER, &element(0x4282, b"webm"));
        let mut info = element(TIMECODE_SCALE, &[0x0F, 0x42, 0x40]);
        info.extend(element(DURATION, &duration_ms.to_be_bytes()));
        let mut children = element(0x114D_9B74, &[0u8; 6]);
        children.extend(element(INFO, &info));
        children.extend(element(CLUSTER, &[0u8; 16]));
        out.extend(unknown_size_segment(&children));
        out
    }

    #[test]
    fn test_webm_duration() {
        let bytes = webm(10_000.0);
        assert!((duration(&bytes).unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_float32_duration_and_custom_scale() {
        let mut info = element(TIMECODE_SCALE, &1_000_000_000u64.to_be_bytes()[4..]);
        info.extend(element(DURATION, &12.5f32.to_be_bytes()));
        let mut bytes = element(EBML_HEADER, &[]);
        bytes.extend(element(SEGMENT, &element(INFO, &info)));
        assert!((duration(&bytes).unwrap() - 12.5).abs() < 1e-6);
    }

    #[test]
    fn test_default_timecode_scale() {
        let info = element(DURATION, &2_500.0f64.to_be_bytes());
        let mut bytes = element(EBML_HEADER, &[]);
        bytes.extend(element(SEGMENT, &element(INFO, &info)));
        assert!((duration(&bytes).unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_duration() {
        let info = element(TIMECODE_SCALE, &[0x0F, 0x42, 0x40]);
        let mut bytes = element(EBML_HEADER, &[]);
        bytes.extend(element(SEGMENT, &element(INFO, &info)));
        let err = duration(&bytes).unwrap_err();
        assert!(err.to_string().contains("no duration"));
    }

    #[test]
    fn test_cluster_before_info() {
        let mut children = element(CLUSTER, &[0u8; 4]);
        children.extend(element(INFO, &element(DURATION, &1.0f64.to_be_bytes())));
        let mut bytes = element(EBML_HEADER, &[]);
        bytes.extend(element(SEGMENT, &children));
        assert!(duration(&bytes).is_err());
    }

    #[test]
    fn test_size_vint_unknown() {
        assert_eq!(read_size(&[0xFF]).unwrap(), (None, 1));
        assert_eq!(read_size(&[0x81]).unwrap(), (Some(1), 1));
        assert_eq!(read_size(&[0x40, 0x02]).unwrap(), (Some(2), 2));
    }
}
