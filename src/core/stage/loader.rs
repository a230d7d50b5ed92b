// snap-overlay-rs/src/core/stage/loader.rs

use crate::core::memory::MemoryBus;
use crate::core::overlay::{OverlayRegistry, SegmentTable};
use crate::core::stage::{LoadEvent, StageId, StageLoadReport, StageResult};
use log::info;

/// Loads the stage overlay, its extra segment, then the shared segments
pub fn select_stage(
    stage: StageId,
    registry: &mut OverlayRegistry,
    segments: &SegmentTable,
    bus: &mut MemoryBus,
) -> StageResult<StageLoadReport> {
    let resources = stage.resources();
    let mut events = Vec::with_capacity(2 + resources.shared.len());
    let mut bytes = 0u64;

    let overlay = registry.load_overlay(resources.overlay, bus)?;
    bytes += overlay.transfer.map_or(0, |t| t.len as u64);
    events.push(LoadEvent::Overlay(resources.overlay));

    for &id in std::iter::once(&resources.extra).chain(resources.shared) {
        let load = bus.load_segment(segments.get(id))?;
        bytes += load.transfer.len as u64;
        events.push(LoadEvent::Segment(id));
    }

    let entry_point = registry.get(resources.overlay).entry_point();
    info!(
        "{} selected: {} loads, 0x{:X} bytes, entry 0x{:08X}",
        stage,
        events.len(),
        bytes,
        entry_point
    );

    Ok(StageLoadReport {
        stage,
        events,
        bytes,
        entry_point,
    })
}
