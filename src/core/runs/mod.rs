//! 区间检测 - 将逐帧匹配信号转换为 [start, end] 区间
//!
//! 状态机只有 Idle / InRun 两个状态，样本必须按帧序号递增输入。

pub mod detector;
pub mod state_machine;

pub use detector::{Run, RunBoundary, RunDetector, RunSet, Snapshot, SnapshotPolicy};
pub use state_machine::{DetectorAction, DetectorState, EndConvention, MatchSample};
