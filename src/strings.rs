//! DBC string-block handling
//!
//! Classic DBC files end with a block of NUL-terminated interned strings.
//! Records reference strings by byte offset into the block, but this crate
//! edits them positionally: the block is split on NUL into an ordered list
//! (index 0 is conventionally the empty string, since the block starts with a
//! NUL) and re-joined with NUL on save. For a valid-UTF-8 block, splitting
//! then joining reproduces the original bytes. Invalid UTF-8 is decoded
//! lossily, so bad bytes come back as replacement characters instead of
//! failing the load.

/// Ordered string list decoded from a DBC trailing string block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringBlock {
    strings: Vec<String>,
}

impl StringBlock {
    /// Split raw block bytes on NUL terminators. Empty entries are kept so
    /// the join on save is byte-faithful for valid UTF-8; invalid bytes are
    /// replaced rather than rejected.
    pub fn from_bytes(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);
        StringBlock {
            strings: text.split('\0').map(str::to_string).collect(),
        }
    }

    /// Re-join the block with NUL separators.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.strings.join("\0").into_bytes()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// Overwrite the string at `index`. Returns false (no change) when the
    /// index is out of bounds.
    pub fn set(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.strings.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_leading_nul_gives_empty_first_entry() {
        let block = StringBlock::from_bytes(b"\0Ragnaros\0Onyxia\0");
        assert_eq!(block.get(0), Some(""));
        assert_eq!(block.get(1), Some("Ragnaros"));
        assert_eq!(block.get(2), Some("Onyxia"));
        assert_eq!(block.get(3), Some(""));
        assert_eq!(block.len(), 4);
    }

    #[test]
    fn test_split_join_roundtrip() {
        let raw = b"\0alpha\0beta\0".to_vec();
        let block = StringBlock::from_bytes(&raw);
        assert_eq!(block.to_bytes(), raw);
    }

    #[test]
    fn test_restartable_split() {
        let raw = b"\0one\0two\0";
        assert_eq!(StringBlock::from_bytes(raw), StringBlock::from_bytes(raw));
    }

    #[test]
    fn test_invalid_utf8_decodes_lossily() {
        let block = StringBlock::from_bytes(b"\0bad\xFFbyte\0");
        assert_eq!(block.get(1), Some("bad\u{FFFD}byte"));
        // the replacement character re-encodes as 3 bytes, so the join is
        // not byte-identical for invalid input
        assert_ne!(block.to_bytes(), b"\0bad\xFFbyte\0".to_vec());
    }

    #[test]
    fn test_set_in_and_out_of_bounds() {
        let mut block = StringBlock::from_bytes(b"\0old\0");
        assert!(block.set(1, "new"));
        assert_eq!(block.get(1), Some("new"));
        assert!(!block.set(10, "nope"));
        assert_eq!(block.len(), 3);
    }
}
