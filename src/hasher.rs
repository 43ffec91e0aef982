const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a-style 64-bit hasher with typed feeds.
///
/// Every feed reduces to one or more 32-bit steps
/// (`h = h * FNV_PRIME ^ value`), and every multi-byte feed is split
/// little-endian by construction, so the resulting hash is independent of
/// host endianness and pointer values.
#[derive(Clone, Copy)]
pub struct Hasher {
    h: u64,
}

impl Hasher {
    pub fn new() -> Self {
        Self {
            h: FNV_OFFSET_BASIS,
        }
    }

    pub fn u32(&mut self, value: u32) {
        self.h = self.h.wrapping_mul(FNV_PRIME) ^ u64::from(value);
    }

    pub fn s32(&mut self, value: i32) {
        self.u32(value as u32);
    }

    pub fn f32(&mut self, value: f32) {
        self.u32(value.to_bits());
    }

    pub fn u64(&mut self, value: u64) {
        self.u32(value as u32);
        self.u32((value >> 32) as u32);
    }

    /// One step per byte.
    pub fn bytes(&mut self, data: &[u8]) {
        for &b in data {
            self.u32(u32::from(b));
        }
    }

    /// One step per little-endian 32-bit word. Trailing bytes that do not
    /// fill a word are ignored; shader code is always a whole number of
    /// words.
    pub fn le_words(&mut self, data: &[u8]) {
        for chunk in data.chunks_exact(4) {
            self.u32(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
    }

    /// A `0xff` sentinel, then one step per byte.
    pub fn string(&mut self, s: &str) {
        self.u32(0xff);
        for b in s.bytes() {
            self.u32(u32::from(b));
        }
    }

    pub fn finish(self) -> u64 {
        self.h
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_of(feed: impl FnOnce(&mut Hasher)) -> u64 {
        let mut h = Hasher::new();
        feed(&mut h);
        h.finish()
    }

    #[test]
    fn identical_feeds_agree() {
        let a = hash_of(|h| {
            h.u32(1);
            h.f32(2.5);
            h.string("main");
        });
        let b = hash_of(|h| {
            h.u32(1);
            h.f32(2.5);
            h.string("main");
        });
        assert_eq!(a, b);
    }

    #[test]
    fn feed_order_matters() {
        let a = hash_of(|h| {
            h.u32(1);
            h.u32(2);
        });
        let b = hash_of(|h| {
            h.u32(2);
            h.u32(1);
        });
        assert_ne!(a, b);
    }

    #[test]
    fn u64_splits_low_then_high() {
        let a = hash_of(|h| h.u64(0x1122_3344_5566_7788));
        let b = hash_of(|h| {
            h.u32(0x5566_7788);
            h.u32(0x1122_3344);
        });
        assert_eq!(a, b);
    }

    #[test]
    fn f32_uses_bit_pattern() {
        let a = hash_of(|h| h.f32(-0.0));
        let b = hash_of(|h| h.f32(0.0));
        assert_ne!(a, b);
    }

    #[test]
    fn le_words_matches_manual_split() {
        let a = hash_of(|h| h.le_words(&[0x78, 0x56, 0x34, 0x12, 0xff, 0x00, 0x00, 0x00]));
        let b = hash_of(|h| {
            h.u32(0x1234_5678);
            h.u32(0xff);
        });
        assert_eq!(a, b);
    }

    #[test]
    fn string_is_sentinel_prefixed() {
        let a = hash_of(|h| h.string(""));
        let b = hash_of(|h| h.u32(0xff));
        assert_eq!(a, b);
        assert_ne!(hash_of(|h| h.string("a")), hash_of(|h| h.string("b")));
    }
}
