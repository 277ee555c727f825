//! # 比特打包模块
//!
//! 在字节序列与比特序列之间转换。每个字节按最低有效位优先展开为 8 个比特，
//! 比特在内存中同样按字节紧凑存放，因此一帧数百万比特只占其八分之一的内存。

use std::ops::Range;

/// 紧凑存放的比特序列，第 `i` 个比特位于 `words[i / 8]` 的第 `i % 8` 位。
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BitBuf {
    words: Vec<u8>,
    len: usize,
}

impl BitBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: Vec::with_capacity(bits.div_ceil(8)),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, bit: bool) {
        let offset = self.len % 8;
        if offset == 0 {
            self.words.push(0);
        }
        if bit {
            self.words[self.len / 8] |= 1 << offset;
        }
        self.len += 1;
    }

    /// 读取第 `index` 个比特，越界时返回 `None`。
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }
        Some((self.words[index / 8] >> (index % 8)) & 1 == 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| (self.words[i / 8] >> (i % 8)) & 1 == 1)
    }

    /// 复制 `range` 范围内的比特，返回一个独立拥有数据的新序列。
    ///
    /// 范围会被截断到序列长度以内。起点按字节对齐时直接复制字节。
    pub fn slice(&self, range: Range<usize>) -> BitBuf {
        let end = range.end.min(self.len);
        let start = range.start.min(end);
        let len = end - start;

        if start % 8 == 0 {
            let words = self.words[start / 8..(start + len).div_ceil(8)].to_vec();
            let mut out = BitBuf { words, len };
            out.clear_tail();
            return out;
        }

        let mut out = BitBuf::with_capacity(len);
        (start..end).for_each(|i| out.push((self.words[i / 8] >> (i % 8)) & 1 == 1));
        out
    }

    /// 保证最后一个字节中超出 `len` 的位为 0。
    fn clear_tail(&mut self) {
        let used = self.len % 8;
        if used != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u8 << used) - 1;
            }
        }
    }
}

impl FromIterator<bool> for BitBuf {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut out = BitBuf::with_capacity(iter.size_hint().0);
        iter.for_each(|bit| out.push(bit));
        out
    }
}

impl std::fmt::Debug for BitBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitBuf").field("len", &self.len).finish()
    }
}

/// 把字节展开为比特序列，字节 `i` 的第 `j` 位成为第 `8 * i + j` 个比特。
pub fn pack(bytes: &[u8]) -> BitBuf {
    BitBuf {
        words: bytes.to_vec(),
        len: bytes.len() * 8,
    }
}

/// 按 8 个一组把比特还原为字节。
///
/// 长度不是 8 的倍数时，末尾不足 8 位的部分被丢弃而不是补零。
pub fn unpack(bits: &BitBuf) -> Vec<u8> {
    bits.words[..bits.len / 8].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_is_lsb_first() {
        let bits = pack(&[0b0000_0101]);
        let collected: Vec<bool> = bits.iter().collect();
        assert_eq!(
            collected,
            vec![true, false, true, false, false, false, false, false]
        );
    }

    #[test]
    fn pack_length_is_eight_per_byte() {
        assert_eq!(pack(&[1, 2, 3]).len(), 24);
        assert!(pack(&[]).is_empty());
    }

    #[test]
    fn unpack_drops_trailing_partial_byte() {
        let mut bits = pack(&[0xAB, 0xCD]);
        for bit in [true, true, false] {
            bits.push(bit);
        }
        assert_eq!(bits.len(), 19);
        assert_eq!(unpack(&bits), vec![0xAB, 0xCD]);
    }

    #[test]
    fn unpack_of_pushed_bits() {
        let bits: BitBuf = [false, true, true, true, false, false, false, true]
            .into_iter()
            .collect();
        assert_eq!(unpack(&bits), vec![0b1000_1110]);
    }

    #[test]
    fn unaligned_slice_matches_bitwise_copy() {
        let bits = pack(&[0x5A, 0xC3, 0x0F]);
        let sliced = bits.slice(3..17);
        assert_eq!(sliced.len(), 14);
        let expected: Vec<bool> = (3..17).map(|i| bits.get(i).unwrap()).collect();
        assert_eq!(sliced.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn aligned_slice_clears_tail_bits() {
        let bits = pack(&[0xFF, 0xFF]);
        let sliced = bits.slice(8..12);
        assert_eq!(sliced, [true; 4].into_iter().collect::<BitBuf>());
    }

    #[test]
    fn slice_is_clamped_to_length() {
        let bits = pack(&[0xFF]);
        assert_eq!(bits.slice(4..100).len(), 4);
        assert!(bits.slice(20..30).is_empty());
    }

    #[test]
    fn get_out_of_range_is_none() {
        let bits = pack(&[0x80]);
        assert_eq!(bits.get(7), Some(true));
        assert_eq!(bits.get(8), None);
    }
}
