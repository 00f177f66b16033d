use super::state_machine::{DetectorAction, DetectorState, EndConvention, MatchSample};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 编码后的帧图像（PNG），起止快照可共享同一份数据
pub type Snapshot = Arc<[u8]>;

/// 哪些帧需要编码保留
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotPolicy {
    None,
    /// 只编码区间起始帧，结束快照复用起始帧
    #[default]
    Start,
    /// 每个匹配帧都编码，结束快照为最后一个匹配帧
    StartAndEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunBoundary {
    pub index: u64,
    pub image: Option<Snapshot>,
}

/// 检测到的连续匹配区间，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    start: RunBoundary,
    end: RunBoundary,
}

impl Run {
    pub(crate) fn new(start: RunBoundary, end: RunBoundary) -> Self {
        debug_assert!(end.index >= start.index);
        Self { start, end }
    }

    pub fn start(&self) -> &RunBoundary {
        &self.start
    }

    pub fn end(&self) -> &RunBoundary {
        &self.end
    }

    pub fn start_index(&self) -> u64 {
        self.start.index
    }

    pub fn end_index(&self) -> u64 {
        self.end.index
    }

    /// Length in frames, `end - start`.
    pub fn length(&self) -> u64 {
        self.end.index - self.start.index
    }
}

/// 按检测顺序排列的区间集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSet {
    runs: Vec<Run>,
    matched_frames: u64,
    processed_frames: u64,
}

impl RunSet {
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Run> {
        self.runs.iter()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of samples that matched, across all runs.
    pub fn matched_frames(&self) -> u64 {
        self.matched_frames
    }

    pub fn processed_frames(&self) -> u64 {
        self.processed_frames
    }
}

impl<'a> IntoIterator for &'a RunSet {
    type Item = &'a Run;
    type IntoIter = std::slice::Iter<'a, Run>;

    fn into_iter(self) -> Self::IntoIter {
        self.runs.iter()
    }
}

pub struct RunDetector {
    state: DetectorState,
    convention: EndConvention,
    policy: SnapshotPolicy,
    start_snapshot: Option<Snapshot>,
    last_snapshot: Option<Snapshot>,
    last_index: Option<u64>,
    runs: Vec<Run>,
    matched_frames: u64,
    processed_frames: u64,
}

impl RunDetector {
    pub fn new() -> Self {
        Self::with_config(EndConvention::default(), SnapshotPolicy::default())
    }

    pub fn with_config(convention: EndConvention, policy: SnapshotPolicy) -> Self {
        Self {
            state: DetectorState::new(),
            convention,
            policy,
            start_snapshot: None,
            last_snapshot: None,
            last_index: None,
            runs: Vec::new(),
            matched_frames: 0,
            processed_frames: 0,
        }
    }

    /// Feeds one sample. `encode` is called at most once, and only when the
    /// snapshot policy needs this frame's bytes.
    pub fn process_sample<F>(&mut self, sample: MatchSample, encode: F) -> DetectorAction
    where
        F: FnOnce() -> Option<Vec<u8>>,
    {
        if let Some(last) = self.last_index {
            if sample.index <= last {
                warn!(
                    "⚠️ Ignoring out-of-order sample {} (last processed {})",
                    sample.index, last
                );
                return DetectorAction::OutOfOrder;
            }
        }

        self.processed_frames += 1;
        if sample.matched {
            self.matched_frames += 1;
        }

        let (new_state, action) = self.state.transition(sample, self.convention);

        match action {
            DetectorAction::Open { start_index } => {
                debug!("Run opened at frame {}", start_index);
                let snapshot = match self.policy {
                    SnapshotPolicy::None => None,
                    _ => encode().map(Snapshot::from),
                };
                self.start_snapshot = snapshot.clone();
                self.last_snapshot = snapshot;
            }
            DetectorAction::Extend => {
                if self.policy == SnapshotPolicy::StartAndEnd {
                    if let Some(bytes) = encode() {
                        self.last_snapshot = Some(Snapshot::from(bytes));
                    }
                }
            }
            DetectorAction::Close {
                start_index,
                end_index,
            } => {
                debug!("Run closed: {} - {}", start_index, end_index);
                self.close_run(start_index, end_index);
            }
            DetectorAction::Continue | DetectorAction::OutOfOrder => {}
        }

        self.state = new_state;
        self.last_index = Some(sample.index);
        action
    }

    fn close_run(&mut self, start_index: u64, end_index: u64) {
        let run = Run::new(
            RunBoundary {
                index: start_index,
                image: self.start_snapshot.take(),
            },
            RunBoundary {
                index: end_index,
                image: self.last_snapshot.take(),
            },
        );
        self.runs.push(run);
    }

    pub fn current_state(&self) -> &DetectorState {
        &self.state
    }

    /// Runs closed so far, not including one still open.
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn frame_count(&self) -> u64 {
        self.processed_frames
    }

    /// 流结束：关闭未完成的区间并交出结果
    pub fn finish(mut self) -> RunSet {
        if let Some((start_index, end_index)) = self.state.flush() {
            debug!("Run flushed at end of stream: {} - {}", start_index, end_index);
            self.close_run(start_index, end_index);
            self.state = DetectorState::Idle;
        }

        RunSet {
            runs: self.runs,
            matched_frames: self.matched_frames,
            processed_frames: self.processed_frames,
        }
    }

    pub fn reset(&mut self) {
        self.state = DetectorState::new();
        self.start_snapshot = None;
        self.last_snapshot = None;
        self.last_index = None;
        self.runs.clear();
        self.matched_frames = 0;
        self.processed_frames = 0;
    }
}

impl Default for RunDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn detect(pattern: &[bool], convention: EndConvention) -> RunSet {
        let mut detector = RunDetector::with_config(convention, SnapshotPolicy::None);
        for (i, &matched) in pattern.iter().enumerate() {
            detector.process_sample(MatchSample::new(i as u64, matched), || None);
        }
        detector.finish()
    }

    fn spans(set: &RunSet) -> Vec<(u64, u64)> {
        set.iter().map(|r| (r.start_index(), r.end_index())).collect()
    }

    /// Maximal runs of `true` as (first true, last true).
    fn true_runs(pattern: &[bool]) -> Vec<(u64, u64)> {
        let mut result = Vec::new();
        let mut start = None;
        for (i, &matched) in pattern.iter().enumerate() {
            match (matched, start) {
                (true, None) => start = Some(i as u64),
                (false, Some(s)) => {
                    result.push((s, i as u64 - 1));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            result.push((s, pattern.len() as u64 - 1));
        }
        result
    }

    #[test]
    fn test_all_patterns_up_to_ten_frames() {
        for len in 0..=10usize {
            for bits in 0u32..(1 << len) {
                let pattern: Vec<bool> = (0..len).map(|i| bits & (1 << i) != 0).collect();
                let expected = true_runs(&pattern);

                for convention in [EndConvention::FirstNonMatching, EndConvention::LastMatching] {
                    let set = detect(&pattern, convention);
                    assert_eq!(set.len(), expected.len(), "pattern {:?}", pattern);
                    assert_eq!(set.processed_frames(), len as u64);
                    assert_eq!(
                        set.matched_frames(),
                        pattern.iter().filter(|&&m| m).count() as u64
                    );

                    for (run, &(first, last)) in set.iter().zip(&expected) {
                        assert_eq!(run.start_index(), first);
                        assert!(run.end_index() >= run.start_index());
                        let expected_end = match convention {
                            EndConvention::LastMatching => last,
                            EndConvention::FirstNonMatching if (last as usize) + 1 < len => {
                                last + 1
                            }
                            EndConvention::FirstNonMatching => last,
                        };
                        assert_eq!(run.end_index(), expected_end, "pattern {:?}", pattern);
                    }

                    for pair in set.runs().windows(2) {
                        assert!(pair[0].end_index() < pair[1].start_index());
                    }
                }
            }
        }
    }

    #[test]
    fn test_single_frame_video() {
        for convention in [EndConvention::FirstNonMatching, EndConvention::LastMatching] {
            let set = detect(&[true], convention);
            assert_eq!(spans(&set), vec![(0, 0)]);
            assert_eq!(set.runs()[0].length(), 0);
        }
    }

    #[test]
    fn test_single_match_then_miss() {
        let first = detect(&[true, false], EndConvention::FirstNonMatching);
        assert_eq!(spans(&first), vec![(0, 1)]);
        assert_eq!(first.runs()[0].length(), 1);

        let last = detect(&[true, false], EndConvention::LastMatching);
        assert_eq!(spans(&last), vec![(0, 0)]);
        assert_eq!(last.runs()[0].length(), 0);
    }

    #[test]
    fn test_no_matches() {
        let set = detect(&[false, false, false], EndConvention::default());
        assert!(set.is_empty());
        assert_eq!(set.matched_frames(), 0);
    }

    #[test]
    fn test_flush_at_end_of_stream() {
        let set = detect(&[false, true, true], EndConvention::FirstNonMatching);
        assert_eq!(spans(&set), vec![(1, 2)]);
    }

    #[test]
    fn test_separated_runs_stay_distinct() {
        let set = detect(
            &[true, true, false, true, false, false, true],
            EndConvention::FirstNonMatching,
        );
        assert_eq!(spans(&set), vec![(0, 2), (3, 4), (6, 6)]);
    }

    #[test]
    fn test_start_policy_encodes_once_per_run() {
        let calls = Cell::new(0);
        let mut detector = RunDetector::with_config(EndConvention::default(), SnapshotPolicy::Start);

        for (i, matched) in [true, true, true, false, true].into_iter().enumerate() {
            detector.process_sample(MatchSample::new(i as u64, matched), || {
                calls.set(calls.get() + 1);
                Some(vec![i as u8])
            });
        }
        let set = detector.finish();

        assert_eq!(calls.get(), 2);
        assert_eq!(set.len(), 2);
        let first = &set.runs()[0];
        assert_eq!(first.start().image.as_deref(), Some(&[0u8][..]));
        assert_eq!(first.end().image.as_deref(), Some(&[0u8][..]));
        assert_eq!(set.runs()[1].start().image.as_deref(), Some(&[4u8][..]));
    }

    #[test]
    fn test_start_and_end_policy_keeps_last_match() {
        let mut detector =
            RunDetector::with_config(EndConvention::default(), SnapshotPolicy::StartAndEnd);

        for (i, matched) in [false, true, true, true, false].into_iter().enumerate() {
            detector.process_sample(MatchSample::new(i as u64, matched), || Some(vec![i as u8]));
        }
        let set = detector.finish();

        let run = &set.runs()[0];
        assert_eq!((run.start_index(), run.end_index()), (1, 4));
        assert_eq!(run.start().image.as_deref(), Some(&[1u8][..]));
        assert_eq!(run.end().image.as_deref(), Some(&[3u8][..]));
    }

    #[test]
    fn test_none_policy_never_encodes() {
        let mut detector = RunDetector::with_config(EndConvention::default(), SnapshotPolicy::None);
        for i in 0..5 {
            detector.process_sample(MatchSample::new(i, true), || {
                panic!("encode should not be called")
            });
        }
        let set = detector.finish();
        assert!(set.runs()[0].start().image.is_none());
    }

    #[test]
    fn test_failed_encode_keeps_run() {
        let mut detector = RunDetector::new();
        detector.process_sample(MatchSample::new(0, true), || None);
        detector.process_sample(MatchSample::new(1, false), || None);
        let set = detector.finish();

        assert_eq!(spans(&set), vec![(0, 1)]);
        assert!(set.runs()[0].start().image.is_none());
    }

    #[test]
    fn test_out_of_order_sample_ignored() {
        let mut detector = RunDetector::new();
        detector.process_sample(MatchSample::new(3, true), || None);
        let action = detector.process_sample(MatchSample::new(2, false), || None);

        assert_eq!(action, DetectorAction::OutOfOrder);
        assert!(matches!(detector.current_state(), DetectorState::InRun { .. }));
        assert_eq!(detector.frame_count(), 1);
    }

    #[test]
    fn test_reset() {
        let mut detector = RunDetector::new();
        detector.process_sample(MatchSample::new(0, true), || None);
        detector.process_sample(MatchSample::new(1, false), || None);
        assert_eq!(detector.runs().len(), 1);

        detector.reset();

        assert!(detector.runs().is_empty());
        assert_eq!(detector.frame_count(), 0);
        assert_eq!(detector.current_state(), &DetectorState::Idle);
        assert!(detector.finish().is_empty());
    }
}
