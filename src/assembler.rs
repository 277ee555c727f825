//! # 文件重组模块
//!
//! 收集每一帧解码出的字节块，按帧序号无缝拼接为原始文件。

use crate::error::{ReelError, Result};

/// 按帧序号收集字节块，缺失任何一帧都拒绝拼接。
#[derive(Debug)]
pub struct FileAssembler {
    slots: Vec<Option<Vec<u8>>>,
}

impl FileAssembler {
    pub fn new(frame_count: usize) -> Self {
        Self {
            slots: vec![None; frame_count],
        }
    }

    /// 放入第 `index` 帧的字节块，插入顺序不限。
    pub fn insert(&mut self, index: usize, chunk: Vec<u8>) -> Result<()> {
        let expected = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(ReelError::UnexpectedFrame { index, expected })?;

        if slot.is_some() {
            return Err(ReelError::DuplicateFrame { index });
        }
        *slot = Some(chunk);
        Ok(())
    }

    /// 按序拼接所有字节块。
    ///
    /// 提供 `expected_len` 时，拼接结果的长度必须与之相等。
    pub fn finish(self, expected_len: Option<u64>) -> Result<Vec<u8>> {
        let total = self.slots.iter().flatten().map(Vec::len).sum();
        let mut out = Vec::with_capacity(total);

        for (index, slot) in self.slots.into_iter().enumerate() {
            let chunk = slot.ok_or(ReelError::MissingFrame { index })?;
            out.extend_from_slice(&chunk);
        }

        if let Some(expected) = expected_len {
            let actual = out.len() as u64;
            if actual != expected {
                return Err(ReelError::LengthMismatch { expected, actual });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_in_index_order() {
        let mut assembler = FileAssembler::new(3);
        assembler.insert(2, vec![5, 6]).unwrap();
        assembler.insert(0, vec![1, 2]).unwrap();
        assembler.insert(1, vec![3, 4]).unwrap();
        assert_eq!(assembler.finish(Some(6)).unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn refuses_missing_frame() {
        let mut assembler = FileAssembler::new(3);
        assembler.insert(0, vec![1]).unwrap();
        assembler.insert(2, vec![3]).unwrap();
        assert!(matches!(
            assembler.finish(None),
            Err(ReelError::MissingFrame { index: 1 })
        ));
    }

    #[test]
    fn refuses_duplicate_and_out_of_range() {
        let mut assembler = FileAssembler::new(1);
        assembler.insert(0, vec![1]).unwrap();
        assert!(matches!(
            assembler.insert(0, vec![1]),
            Err(ReelError::DuplicateFrame { index: 0 })
        ));
        assert!(matches!(
            assembler.insert(1, vec![2]),
            Err(ReelError::UnexpectedFrame { index: 1, expected: 1 })
        ));
    }

    #[test]
    fn length_mismatch_is_reported() {
        let mut assembler = FileAssembler::new(1);
        assembler.insert(0, vec![0; 4]).unwrap();
        assert!(matches!(
            assembler.finish(Some(3)),
            Err(ReelError::LengthMismatch { expected: 3, actual: 4 })
        ));
    }

    #[test]
    fn empty_set_assembles_to_nothing() {
        assert!(FileAssembler::new(0).finish(Some(0)).unwrap().is_empty());
    }
}
