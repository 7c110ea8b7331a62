// Path: crates/types/src/codec.rs
//! The canonical, deterministic binary codecs for consensus-critical data.
//!
//! Two codecs cover the two wire forms every transaction must support:
//!
//! * the **canonical (schema-based) codec** — thin wrappers around
//!   `parity-scale-codec` (SCALE). Centralizing it here guarantees every
//!   crate serializes state with the exact same format, preventing
//!   consensus failures from divergent binary representations.
//! * the **length-prefixed primitives** — the building blocks of the
//!   recursive signing/relay encoding: every field is a u32 big-endian
//!   length followed by the field bytes, nested structures recurse with
//!   the same scheme. Encoding a decoded value must reproduce the original
//!   bytes exactly, because transaction hashes are computed over this
//!   form.

use parity_scale_codec::{Decode, DecodeAll, Encode};

/// Encodes a value into its canonical SCALE byte representation.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Vec<u8> {
    v.encode()
}

/// Decodes a value from its canonical SCALE byte representation, failing
/// fast (including on trailing bytes) so malformed data never reaches a
/// consensus context.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, String> {
    T::decode_all(&mut &*b).map_err(|e| format!("canonical decode failed: {}", e))
}

/// Appends one length-prefixed field to `out`.
pub fn put_field(out: &mut Vec<u8>, field: &[u8]) {
    out.extend_from_slice(&(field.len() as u32).to_be_bytes());
    out.extend_from_slice(field);
}

/// A cursor over length-prefixed fields.
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Reads the next length-prefixed field.
    pub fn next_field(&mut self) -> Result<&'a [u8], String> {
        let hdr = self
            .buf
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| "truncated field length".to_string())?;
        let len = u32::from_be_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]) as usize;
        self.pos += 4;
        let field = self
            .buf
            .get(self.pos..self.pos + len)
            .ok_or_else(|| format!("truncated field of {} bytes", len))?;
        self.pos += len;
        Ok(field)
    }

    /// True once every byte has been consumed.
    pub fn is_done(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Fails unless every byte has been consumed; trailing garbage would
    /// otherwise survive a decode-encode round trip undetected.
    pub fn finish(self) -> Result<(), String> {
        if self.pos == self.buf.len() {
            Ok(())
        } else {
            Err(format!("{} trailing bytes after last field", self.buf.len() - self.pos))
        }
    }
}
