// snap-overlay-rs/src/core/stage/mod.rs

//! Stage selection
//!
//! Each stage owns one code overlay, one extra data segment and an ordered
//! list of shared creature segments. Selecting a stage loads exactly those,
//! in that order.

pub mod loader;
pub mod state;

pub use loader::select_stage;
pub use state::ActiveStageState;

use crate::core::dma::DmaError;
use crate::core::overlay::{OverlayError, OverlayId, SegmentId};
use std::fmt;
use thiserror::Error;

/// Playable stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageId {
    Stage0,
    Stage1,
    Stage2,
    Stage3,
    Stage4,
    Stage5,
    Stage6,
}

impl StageId {
    pub const COUNT: usize = 7;

    pub const ALL: [StageId; Self::COUNT] = [
        StageId::Stage0,
        StageId::Stage1,
        StageId::Stage2,
        StageId::Stage3,
        StageId::Stage4,
        StageId::Stage5,
        StageId::Stage6,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Resources loaded when this stage is selected
    pub fn resources(self) -> &'static StageResources {
        &STAGE_TABLE[self.index()]
    }
}

impl TryFrom<i32> for StageId {
    type Error = StageError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(StageError::UnknownStage(value as i64))
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {}", self.index())
    }
}

/// Overlay and segments belonging to one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageResources {
    pub overlay: OverlayId,
    pub extra: SegmentId,
    /// Shared segments, in load order
    pub shared: &'static [SegmentId],
}

use crate::core::overlay::SegmentId::{
    Bulbasaur1, Bulbasaur2, Magikarp1, Magikarp2, Pikachu1, Pikachu2, Zubat1, Zubat2,
};

pub static STAGE_TABLE: [StageResources; StageId::COUNT] = [
    StageResources {
        overlay: OverlayId::Stage0,
        extra: SegmentId::Stage0Extra,
        shared: &[Magikarp1, Magikarp2, Pikachu1, Pikachu2],
    },
    StageResources {
        overlay: OverlayId::Stage1,
        extra: SegmentId::Stage1Extra,
        shared: &[Magikarp1, Magikarp2, Pikachu1, Pikachu2, Zubat1, Zubat2],
    },
    StageResources {
        overlay: OverlayId::Stage2,
        extra: SegmentId::Stage2Extra,
        shared: &[Magikarp1, Magikarp2],
    },
    StageResources {
        overlay: OverlayId::Stage3,
        extra: SegmentId::Stage3Extra,
        shared: &[Bulbasaur1, Bulbasaur2, Magikarp1, Magikarp2, Pikachu1, Pikachu2],
    },
    StageResources {
        overlay: OverlayId::Stage4,
        extra: SegmentId::Stage4Extra,
        shared: &[
            Bulbasaur1, Bulbasaur2, Magikarp1, Magikarp2, Pikachu1, Pikachu2, Zubat1, Zubat2,
        ],
    },
    StageResources {
        overlay: OverlayId::Stage5,
        extra: SegmentId::Stage5Extra,
        shared: &[Magikarp1, Magikarp2],
    },
    StageResources {
        overlay: OverlayId::Stage6,
        extra: SegmentId::Stage6Extra,
        shared: &[],
    },
];

/// One load performed by a stage selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadEvent {
    Overlay(OverlayId),
    Segment(SegmentId),
}

/// Summary of a stage selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLoadReport {
    pub stage: StageId,
    pub events: Vec<LoadEvent>,
    /// Bytes copied from ROM across all loads
    pub bytes: u64,
    pub entry_point: u32,
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("unknown stage index {0}")]
    UnknownStage(i64),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Dma(#[from] DmaError),
}

pub type StageResult<T> = Result<T, StageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_index_conversion() {
        for (i, stage) in StageId::ALL.iter().enumerate() {
            assert_eq!(StageId::try_from(i as i32).unwrap(), *stage);
        }
        assert!(matches!(StageId::try_from(7i32), Err(StageError::UnknownStage(7))));
        assert!(matches!(StageId::try_from(-1i32), Err(StageError::UnknownStage(-1))));
    }

    #[test]
    fn test_table_pairs_overlay_and_extra() {
        for stage in StageId::ALL {
            let res = stage.resources();
            assert_eq!(res.overlay.index(), stage.index());
            assert_eq!(res.extra.index(), SegmentId::Stage0Extra.index() + stage.index());
            assert!(res.shared.iter().all(|s| *s < SegmentId::Stage0Extra));
        }
        assert!(StageId::Stage6.resources().shared.is_empty());
        assert_eq!(StageId::Stage4.resources().shared.len(), 8);
    }
}
