//! # 帧调度模块
//!
//! 把完整的比特流切分为按帧对齐的块，在有界的工作线程池中并发编码，
//! 并为每一帧分配确定的、可按字典序排序的输出路径。
//!
//! 线程通过原子游标领取帧序号，因此执行顺序不确定，但序号与比特范围的对应关系是确定的。
//! 所有线程在 `std::thread::scope` 结束时汇合，之后才返回结果。

use crate::assembler::FileAssembler;
use crate::bits::{self, BitBuf};
use crate::codec::{self, DecodeMode};
use crate::config::{FrameConfig, FrameFormat};
use crate::constants::FRAME_PREFIX;
use crate::error::{ReelError, Result};
use image::RgbImage;
use log::{debug, trace, warn};
use std::fs;
use std::io::ErrorKind;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

/// 帧画布的写出目标。
///
/// 每次调用只会写一个独立的路径，实现必须允许多个线程同时调用。
pub trait FrameSink: Sync {
    fn write(&self, index: usize, path: &Path, canvas: &RgbImage) -> Result<()>;
}

/// 使用 `image` 按指定格式把画布保存为文件。
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSink {
    pub format: FrameFormat,
}

impl FileSink {
    pub fn new(format: FrameFormat) -> Self {
        Self { format }
    }
}

impl FrameSink for FileSink {
    fn write(&self, _index: usize, path: &Path, canvas: &RgbImage) -> Result<()> {
        canvas
            .save_with_format(path, self.format.image_format())
            .map_err(|e| ReelError::image(path, e))
    }
}

/// 帧序号的补零宽度，等于总帧数的十进制位数。
pub fn frame_digits(frame_count: usize) -> usize {
    frame_count.max(1).to_string().len()
}

/// 第 `index` 帧的文件名，例如共 120 帧时第 7 帧为 `out_007.png`。
pub fn frame_file_name(index: usize, frame_count: usize, ext: &str) -> String {
    let width = frame_digits(frame_count);
    format!("{FRAME_PREFIX}{index:0width$}.{ext}")
}

pub fn frame_path(dir: &Path, index: usize, frame_count: usize, ext: &str) -> PathBuf {
    dir.join(frame_file_name(index, frame_count, ext))
}

/// 判断文件名是否形如帧文件 `out_<数字>.<扩展名>`。
pub fn is_frame_file_name(name: &str) -> bool {
    name.strip_prefix(FRAME_PREFIX)
        .and_then(|rest| rest.split_once('.'))
        .is_some_and(|(digits, _)| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// 一帧的工作描述：序号、在全局比特流中的范围以及输出路径。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    pub index: usize,
    pub bits: Range<usize>,
    pub path: PathBuf,
}

/// 计算覆盖 `total_bits` 个比特所需的全部帧。
pub fn plan_frames(total_bits: usize, config: &FrameConfig, dir: &Path) -> Vec<FramePlan> {
    let capacity = config.capacity();
    let frame_count = config.frame_count(total_bits);
    let ext = config.format.extension();

    (0..frame_count)
        .map(|index| FramePlan {
            index,
            bits: index * capacity..((index + 1) * capacity).min(total_bits),
            path: frame_path(dir, index, frame_count, ext),
        })
        .collect()
}

/// 删除路径列表中已经存在的文件，不存在的文件直接跳过。
pub fn remove_files<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Result<()> {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => trace!("removed {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(ReelError::io(path, e)),
        }
    }
    Ok(())
}

/// 有界线程池形式的帧调度器。
#[derive(Debug)]
pub struct FrameScheduler {
    config: FrameConfig,
    cancel: Arc<AtomicBool>,
    completed: AtomicUsize,
}

impl FrameScheduler {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
            completed: AtomicUsize::new(0),
        }
    }

    /// 使用外部的取消标记。标记被置位后，线程不再领取新的帧。
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// 已完成的帧数，可在其他线程中读取以显示进度。
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// 在线程池中执行 `jobs` 个任务，返回按序号排序的结果。
    ///
    /// 第一个失败的任务会让其余线程停止领取新任务，并在所有线程汇合后作为结果返回。
    fn run_pool<T, F>(&self, jobs: usize, job: F) -> Result<Vec<(usize, T)>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync,
    {
        let workers = self.config.worker_count(jobs);
        let cursor = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let first_error = OnceLock::new();

        debug!("running {jobs} frame jobs on {workers} workers");

        let (cursor, abort, failure, job) = (&cursor, &abort, &first_error, &job);

        let joined = thread::scope(|s| {
            let mut handles = Vec::with_capacity(workers);
            for _ in 0..workers {
                handles.push(s.spawn(move || {
                    let mut done = Vec::new();
                    while !abort.load(Ordering::Relaxed) {
                        if self.is_cancelled() {
                            abort.store(true, Ordering::Relaxed);
                            let _ = failure.set(ReelError::Cancelled);
                            break;
                        }
                        let index = cursor.fetch_add(1, Ordering::Relaxed);
                        if index >= jobs {
                            break;
                        }
                        match job(index) {
                            Ok(value) => {
                                done.push((index, value));
                                self.completed.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => {
                                warn!("frame {index} failed: {e}");
                                abort.store(true, Ordering::Relaxed);
                                let _ = failure.set(e);
                            }
                        }
                    }
                    done
                }));
            }

            handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
        });

        if let Some(e) = first_error.into_inner() {
            return Err(e);
        }

        let mut results = Vec::with_capacity(jobs);
        for outcome in joined {
            results.extend(outcome.map_err(|_| ReelError::WorkerPanicked)?);
        }
        results.sort_unstable_by_key(|(index, _)| *index);
        Ok(results)
    }

    /// 把比特流编码为 `dir` 下的一组帧文件，返回按序号排列的路径。
    ///
    /// 每个任务持有自己那一段比特的副本。任何一帧失败都会中止整个操作，
    /// 并删除本次已经写出的所有帧文件。
    pub fn encode(&self, bits: &BitBuf, dir: &Path, sink: &dyn FrameSink) -> Result<Vec<PathBuf>> {
        let plans = plan_frames(bits.len(), &self.config, dir);
        debug!(
            "{} bits -> {} frames of {} bits",
            bits.len(),
            plans.len(),
            self.config.capacity()
        );

        let outcome = self.run_pool(plans.len(), |index| {
            let plan = &plans[index];
            let chunk = bits.slice(plan.bits.clone());
            let canvas = codec::encode_frame(&chunk, &self.config)?;
            sink.write(plan.index, &plan.path, &canvas)?;
            trace!("frame {} written to {}", plan.index, plan.path.display());
            Ok(())
        });

        match outcome {
            Ok(_) => Ok(plans.into_iter().map(|plan| plan.path).collect()),
            Err(e) => {
                if let Err(cleanup) = remove_files(plans.iter().map(|plan| plan.path.as_path())) {
                    warn!("failed to remove partial frame set: {cleanup}");
                }
                Err(e)
            }
        }
    }

    /// 并发解码一组按序号排列的帧文件，结果交给 `FileAssembler` 按序拼接。
    ///
    /// 每个帧文件独立还原为字节块；帧容量按字节对齐，所以块之间不会拆分字节。
    pub fn decode(&self, paths: &[PathBuf], mode: DecodeMode) -> Result<FileAssembler> {
        let chunks = self.run_pool(paths.len(), |index| {
            let path = &paths[index];
            if !path.exists() {
                return Err(ReelError::MissingFrame { index });
            }
            let canvas = image::open(path)
                .map_err(|e| ReelError::image(path, e))?
                .to_rgb8();
            let bits = codec::decode_frame(&canvas, &self.config, mode)?;
            trace!("frame {index} decoded to {} bits", bits.len());
            Ok(bits::unpack(&bits))
        })?;

        let mut assembler = FileAssembler::new(paths.len());
        for (index, chunk) in chunks {
            assembler.insert(index, chunk)?;
        }
        Ok(assembler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_follow_frame_count() {
        assert_eq!(frame_digits(0), 1);
        assert_eq!(frame_digits(9), 1);
        assert_eq!(frame_digits(10), 2);
        assert_eq!(frame_digits(120), 3);
    }

    #[test]
    fn file_names_sort_numerically() {
        let mut names: Vec<_> = (0..120).map(|i| frame_file_name(i, 120, "png")).collect();
        assert_eq!(names[7], "out_007.png");
        let numeric = names.clone();
        names.sort();
        assert_eq!(names, numeric);
    }

    #[test]
    fn recognises_frame_file_names() {
        assert!(is_frame_file_name("out_0.png"));
        assert!(is_frame_file_name("out_0042.bmp"));
        assert!(!is_frame_file_name("out_.png"));
        assert!(!is_frame_file_name("out_a1.png"));
        assert!(!is_frame_file_name("manifest.json"));
    }

    #[test]
    fn plan_covers_stream_in_order() {
        let config = FrameConfig::new(16, 8).unwrap();
        let plans = plan_frames(80, &config, Path::new("frames"));
        let ranges: Vec<_> = plans.iter().map(|p| p.bits.clone()).collect();
        assert_eq!(ranges, vec![0..32, 32..64, 64..80]);
        assert_eq!(plans[2].path, Path::new("frames").join("out_2.png"));
    }

    #[test]
    fn pool_results_are_sorted_by_index() {
        let config = FrameConfig::new(16, 8)
            .unwrap()
            .with_threads(std::num::NonZeroUsize::new(3));
        let scheduler = FrameScheduler::new(config);
        let results = scheduler.run_pool(10, |index| Ok(index * 2)).unwrap();
        let expected: Vec<_> = (0..10).map(|i| (i, i * 2)).collect();
        assert_eq!(results, expected);
        assert_eq!(scheduler.completed(), 10);
    }

    #[test]
    fn pool_propagates_first_failure() {
        let scheduler = FrameScheduler::new(FrameConfig::new(16, 8).unwrap());
        let result = scheduler.run_pool(5, |index| {
            if index == 3 {
                Err(ReelError::MissingFrame { index })
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(ReelError::MissingFrame { index: 3 })));
    }

    #[test]
    fn cancelled_pool_runs_nothing() {
        let cancel = Arc::new(AtomicBool::new(true));
        let scheduler = FrameScheduler::new(FrameConfig::new(16, 8).unwrap()).with_cancel(cancel);
        let result = scheduler.run_pool(5, |_| Ok(()));
        assert!(matches!(result, Err(ReelError::Cancelled)));
        assert_eq!(scheduler.completed(), 0);
    }
}
