//! ISO base media file format (mp4/mov) duration reader

use crate::domain::errors::DomainError;

const TOP_LEVEL_KINDS: [&[u8; 4]; 8] = [
    b"ftyp", b"moov", b"mdat", b"free", b"skip", b"wide", b"pnot", b"uuid",
];

/// Location of one box inside the buffer
#[derive(Debug, Clone, Copy)]
struct BoxHeader {
    kind: [u8; 4],
    payload_start: usize,
    end: usize,
}

/// Cheap check on the first box header
pub fn looks_like_iso_bmff(bytes: &[u8]) -> bool {
    if bytes.len() < 8 {
        return false;
    }
    let size = read_u32(bytes, 0).unwrap_or(0);
    let kind = &bytes[4..8];
    (size == 0 || size == 1 || size >= 8) && TOP_LEVEL_KINDS.iter().any(|k| &k[..] == kind)
}

/// Movie duration in seconds from `moov/mvhd`
pub fn duration(bytes: &[u8]) -> Result<f64, DomainError> {
    let moov = find_child(bytes, 0, bytes.len(), b"moov")?
        .ok_or_else(|| DomainError::ProbeFail("no moov box found".to_string()))?;
    let mvhd = find_child(bytes, moov.payload_start, moov.end, b"mvhd")?
        .ok_or_else(|| DomainError::ProbeFail("moov box has no mvhd header".to_string()))?;

    parse_mvhd(&bytes[mvhd.payload_start..mvhd.end])
}

fn parse_mvhd(payload: &[u8]) -> Result<f64, DomainError> {
    let truncated = || DomainError::ProbeFail("mvhd header is truncated".to_string());
    let version = *payload.first().ok_or_else(truncated)?;

    let (timescale, duration) = match version {
        0 => {
            let timescale = read_u32(payload, 12).ok_or_else(truncated)?;
            let duration = read_u32(payload, 16).ok_or_else(truncated)?;
            if duration == u32::MAX {
                return Err(DomainError::ProbeFail("movie duration is unknown".to_string()));
            }
            (timescale, duration as u64)
        }
        1 => {
            let timescale = read_u32(payload, 20).ok_or_else(truncated)?;
            let duration = read_u64(payload, 24).ok_or_else(truncated)?;
            if duration == u64::MAX {
                return Err(DomainError::ProbeFail("movie duration is unknown".to_string()));
            }
            (timescale, duration)
        }
        other => {
            return Err(DomainError::ProbeFail(format!(
                "unsupported mvhd version {}",
                other
            )))
        }
    };

    if timescale == 0 {
        return Err(DomainError::ProbeFail("mvhd timescale is zero".to_string()));
    }

    Ok(duration as f64 / timescale as f64)
}

/// First box of `kind` among the siblings in `[start, end)`
fn find_child(
    bytes: &[u8],
    start: usize,
    end: usize,
    kind: &[u8; 4],
) -> Result<Option<BoxHeader>, DomainError> {
    let mut offset = start;
    while let Some(header) = read_box(bytes, offset, end)? {
        if &header.kind == kind {
            return Ok(Some(header));
        }
        if header.end <= offset {
            break;
        }
        offset = header.end;
    }
    Ok(None)
}

fn read_box(bytes: &[u8], offset: usize, limit: usize) -> Result<Option<BoxHeader>, DomainError> {
    let limit = limit.min(bytes.len());
    if offset.checked_add(8).map_or(true, |header_end| header_end > limit) {
        return Ok(None);
    }

    let size32 = read_u32(bytes, offset).unwrap_or(0);
    let mut kind = [0u8; 4];
    kind.copy_from_slice(&bytes[offset + 4..offset + 8]);

    let (size, header_len) = match size32 {
        0 => ((limit - offset) as u64, 8usize),
        1 => {
            let large = read_u64(bytes, offset + 8).ok_or_else(|| {
                DomainError::ProbeFail("box with 64-bit size is truncated".to_string())
            })?;
            (large, 16usize)
        }
        n => (n as u64, 8usize),
    };

    if size < header_len as u64 {
        return Err(DomainError::ProbeFail(format!(
            "malformed '{}' box of size {}",
            String::from_utf8_lossy(&kind),
            size
        )));
    }

    // Files cut short keep whatever part of the box is present.
    let end = usize::try_from(size)
        .ok()
        .and_then(|size| offset.checked_add(size))
        .map_or(limit, |end| end.min(limit));

    Ok(Some(BoxHeader {
        kind,
        payload_start: (offset + header_len).min(end),
        end,
    }))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let slice = bytes.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes(slice.try_into().ok()?))
}

fn read_u64(bytes: &[u8], at: usize) -> Option<u64> {
    let slice = bytes.get(at..at.checked_add(8)?)?;
    Some(u64::from_be_bytes(slice.try_into().ok()?))
}
