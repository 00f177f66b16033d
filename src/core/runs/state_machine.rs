use serde::{Deserialize, Serialize};

/// 关闭区间时 end 帧的取法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndConvention {
    /// end = 第一个不匹配的帧，length = 匹配帧数
    #[default]
    FirstNonMatching,
    /// end = 最后一个匹配的帧
    LastMatching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSample {
    pub index: u64,
    pub matched: bool,
}

impl MatchSample {
    pub fn new(index: u64, matched: bool) -> Self {
        Self { index, matched }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    InRun {
        start_index: u64,
        last_match_index: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorAction {
    Continue,
    Open { start_index: u64 },
    Extend,
    Close { start_index: u64, end_index: u64 },
    OutOfOrder,
}

impl DetectorState {
    pub fn new() -> Self {
        DetectorState::Idle
    }

    pub fn transition(
        &self,
        sample: MatchSample,
        convention: EndConvention,
    ) -> (DetectorState, DetectorAction) {
        match self {
            DetectorState::Idle => {
                if sample.matched {
                    (
                        DetectorState::InRun {
                            start_index: sample.index,
                            last_match_index: sample.index,
                        },
                        DetectorAction::Open {
                            start_index: sample.index,
                        },
                    )
                } else {
                    (DetectorState::Idle, DetectorAction::Continue)
                }
            }

            DetectorState::InRun {
                start_index,
                last_match_index,
            } => {
                if sample.matched {
                    (
                        DetectorState::InRun {
                            start_index: *start_index,
                            last_match_index: sample.index,
                        },
                        DetectorAction::Extend,
                    )
                } else {
                    let end_index = match convention {
                        EndConvention::FirstNonMatching => sample.index,
                        EndConvention::LastMatching => *last_match_index,
                    };
                    (
                        DetectorState::Idle,
                        DetectorAction::Close {
                            start_index: *start_index,
                            end_index,
                        },
                    )
                }
            }
        }
    }

    /// 流结束时关闭未完成的区间，end = 最后处理的帧
    pub fn flush(&self) -> Option<(u64, u64)> {
        match self {
            DetectorState::Idle => None,
            DetectorState::InRun {
                start_index,
                last_match_index,
            } => Some((*start_index, *last_match_index)),
        }
    }
}

impl Default for DetectorState {
    fn default() -> Self {
        Self::new()
    }
}
