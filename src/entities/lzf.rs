//! LZF decompression for `DATA binary_compressed` PCD payloads.

use super::traits::DecodeError;

/// Largest output per input byte: a 3-byte back reference copies 264 bytes
pub const MAX_EXPANSION: usize = 88;

/// Decompress an LZF block into exactly `expected_len` bytes
///
/// `expected_len` comes from the file, so it only bounds the output; the
/// buffer grows with what the input actually produces.
pub fn decompress(input: &[u8], expected_len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut out: Vec<u8> = Vec::with_capacity(expected_len.min(input.len().saturating_mul(8)));
    let mut ip = 0usize;

    while ip < input.len() {
        let ctrl = input[ip] as usize;
        ip += 1;

        if ctrl < 32 {
            // Literal run
            let run = ctrl + 1;
            if ip + run > input.len() {
                return Err(DecodeError::Decompress("literal run past end of input".into()));
            }
            if out.len() + run > expected_len {
                return Err(DecodeError::Decompress("output overflow".into()));
            }
            out.extend_from_slice(&input[ip..ip + run]);
            ip += run;
        } else {
            // Back reference
            let mut len = ctrl >> 5;
            if len == 7 {
                let ext = *input
                    .get(ip)
                    .ok_or_else(|| DecodeError::Decompress("truncated length byte".into()))?;
                len += ext as usize;
                ip += 1;
            }
            len += 2;

            let low = *input
                .get(ip)
                .ok_or_else(|| DecodeError::Decompress("truncated offset byte".into()))?;
            ip += 1;
            let offset = ((ctrl & 0x1f) << 8) + low as usize + 1;

            if offset > out.len() {
                return Err(DecodeError::Decompress(format!(
                    "back reference {} before start of output ({})",
                    offset,
                    out.len()
                )));
            }
            if out.len() + len > expected_len {
                return Err(DecodeError::Decompress("output overflow".into()));
            }
            // Byte-wise copy: source and destination may overlap
            let start = out.len() - offset;
            for i in 0..len {
                let b = out[start + i];
                out.push(b);
            }
        }
    }

    if out.len() != expected_len {
        return Err(DecodeError::Decompress(format!(
            "expected {} bytes, got {}",
            expected_len,
            out.len()
        )));
    }
    Ok(out)
}
