//! Chunk planning and index-addressed reassembly.

use crate::error::{DownloadError, Error, Result};

/// One byte range of a remote resource, consumed exactly once by a worker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkTask {
    /// Position of this chunk in the reassembled buffer
    pub index: usize,
    /// Byte offset into the resource
    pub offset: u64,
    /// Number of bytes requested
    pub length: u64,
}

/// Bytes fetched for one [`ChunkTask`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkResult {
    /// Index of the task that produced these bytes
    pub index: usize,
    /// Decoded payload
    pub bytes: Vec<u8>,
}

/// Partition `total_size` bytes into `ceil(total_size / chunk_size)` consecutive tasks
pub fn plan_chunks(total_size: u64, chunk_size: u64) -> Result<Vec<ChunkTask>> {
    if chunk_size == 0 {
        return Err(Error::InvalidInput("chunk size must be positive".to_string()));
    }

    let count = total_size.div_ceil(chunk_size);
    Ok((0..count)
        .map(|i| {
            let offset = i * chunk_size;
            ChunkTask {
                index: i as usize,
                offset,
                length: chunk_size.min(total_size - offset),
            }
        })
        .collect())
}

/// Collects chunk results in any arrival order and concatenates them by index.
#[derive(Debug)]
pub struct ChunkAssembler {
    slots: Vec<Option<Vec<u8>>>,
    filled: usize,
}

impl ChunkAssembler {
    /// Prepare slots for `count` chunks
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![None; count],
            filled: 0,
        }
    }

    /// Store the bytes of one chunk at its index
    pub fn insert(&mut self, result: ChunkResult) -> Result<()> {
        let total = self.slots.len();
        let slot = self.slots.get_mut(result.index).ok_or_else(|| {
            Error::InvalidInput(format!(
                "chunk index {} out of range for {} chunks",
                result.index, total
            ))
        })?;

        if slot.is_some() {
            return Err(Error::InvalidInput(format!(
                "chunk {} delivered twice",
                result.index
            )));
        }

        *slot = Some(result.bytes);
        self.filled += 1;
        Ok(())
    }

    /// Number of chunks stored so far
    pub fn completed(&self) -> usize {
        self.filled
    }

    /// Total number of chunks expected
    pub fn total(&self) -> usize {
        self.slots.len()
    }

    /// Concatenate every chunk in index order, checking the declared size when known
    pub fn finish(self, expected_size: Option<u64>) -> Result<Vec<u8>> {
        let capacity = self.slots.iter().flatten().map(Vec::len).sum();
        let mut buffer = Vec::with_capacity(capacity);

        for (index, slot) in self.slots.into_iter().enumerate() {
            let bytes = slot.ok_or(DownloadError::MissingChunk { index })?;
            buffer.extend_from_slice(&bytes);
        }

        if let Some(expected) = expected_size
            && buffer.len() as u64 != expected
        {
            return Err(DownloadError::SizeMismatch {
                expected,
                actual: buffer.len() as u64,
            }
            .into());
        }

        Ok(buffer)
    }
}

/// Rounded completion percentage
pub(crate) fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((completed as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn task_count_is_ceiling_of_size_over_chunk() {
        for (size, chunk, expected) in [
            (30 * MIB, 10 * MIB, 3),
            (30 * MIB + 1, 10 * MIB, 4),
            (1, 10 * MIB, 1),
            (27, 5, 6),
        ] {
            let tasks = plan_chunks(size, chunk).unwrap();
            assert_eq!(tasks.len(), expected, "size={size} chunk={chunk}");
            let covered: u64 = tasks.iter().map(|t| t.length).sum();
            assert_eq!(covered, size, "tasks must cover the whole resource");
        }
    }

    #[test]
    fn tasks_are_contiguous_and_indexed() {
        let tasks = plan_chunks(27, 5).unwrap();
        for (i, task) in tasks.iter().enumerate() {
            assert_eq!(task.index, i);
            assert_eq!(task.offset, i as u64 * 5);
        }
        assert_eq!(tasks.last().unwrap().length, 2);
    }

    #[test]
    fn zero_chunk_size_fails_fast() {
        assert!(matches!(plan_chunks(10, 0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn reassembly_ignores_arrival_order() {
        let data: Vec<u8> = (0..=250).collect();
        let tasks = plan_chunks(data.len() as u64, 32).unwrap();
        let chunk_of = |t: &ChunkTask| ChunkResult {
            index: t.index,
            bytes: data[t.offset as usize..(t.offset + t.length) as usize].to_vec(),
        };

        let orders: [Vec<usize>; 3] = [
            (0..tasks.len()).collect(),
            (0..tasks.len()).rev().collect(),
            vec![3, 0, 7, 1, 6, 2, 5, 4],
        ];

        for order in orders {
            let mut assembler = ChunkAssembler::new(tasks.len());
            for i in order {
                assembler.insert(chunk_of(&tasks[i])).unwrap();
            }
            assert_eq!(assembler.completed(), tasks.len());
            let buffer = assembler.finish(Some(data.len() as u64)).unwrap();
            assert_eq!(buffer, data);
        }
    }

    #[test]
    fn missing_chunk_is_reported() {
        let mut assembler = ChunkAssembler::new(2);
        assembler
            .insert(ChunkResult {
                index: 1,
                bytes: vec![1],
            })
            .unwrap();

        let err = assembler.finish(None).unwrap_err();
        assert!(matches!(
            err,
            Error::Download(DownloadError::MissingChunk { index: 0 })
        ));
    }

    #[test]
    fn size_mismatch_is_reported() {
        let mut assembler = ChunkAssembler::new(1);
        assembler
            .insert(ChunkResult {
                index: 0,
                bytes: vec![0; 4],
            })
            .unwrap();

        let err = assembler.finish(Some(5)).unwrap_err();
        assert!(matches!(
            err,
            Error::Download(DownloadError::SizeMismatch {
                expected: 5,
                actual: 4
            })
        ));
    }

    #[test]
    fn duplicate_and_out_of_range_chunks_are_rejected() {
        let mut assembler = ChunkAssembler::new(1);
        let chunk = ChunkResult {
            index: 0,
            bytes: vec![9],
        };
        assembler.insert(chunk.clone()).unwrap();
        assert!(assembler.insert(chunk).is_err());
        assert!(
            assembler
                .insert(ChunkResult {
                    index: 4,
                    bytes: vec![]
                })
                .is_err()
        );
    }

    #[test]
    fn percent_rounds_to_nearest() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 100);
    }
}
