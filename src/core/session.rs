// snap-overlay-rs/src/core/session.rs

//! Game session
//!
//! Owns the bus, both descriptor tables, the overlay registry, the active
//! stage state and the scene manager. `SharedSession` wraps a session for
//! hosts that drive it from several threads.

use crate::core::config::{ConfigError, OverlayConfig};
use crate::core::dma::{DmaError, Inflater};
use crate::core::memory::{MemoryBus, MemoryError, Rom, SaveMemory, SegmentLoad, WindowOwner};
use crate::core::overlay::{
    OverlayError, OverlayId, OverlayLoad, OverlayRegistry, OverlayTable, Relocator, SegmentId,
    SegmentTable, TableError,
};
use crate::core::scene::{SceneManager, SceneState, SceneStep};
use crate::core::stage::{self, ActiveStageState, StageError, StageId, StageLoadReport};
use log::info;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid descriptor table: {0}")]
    Table(#[from] TableError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Dma(#[from] DmaError),
}

pub type SessionResult<T> = Result<T, SessionError>;

pub struct GameSession {
    config: OverlayConfig,
    bus: MemoryBus,
    segments: SegmentTable,
    overlays: OverlayRegistry,
    stage_state: ActiveStageState,
    scene: SceneManager,
    current_stage: Option<StageId>,
}

impl GameSession {
    pub fn new(
        config: OverlayConfig,
        rom: Rom,
        segments: SegmentTable,
        overlays: OverlayTable,
    ) -> SessionResult<Self> {
        config.validate()?;

        let mut bus = MemoryBus::new(rom, &config);
        if config.save_size > 0 {
            bus.attach_save(SaveMemory::new(config.save_size));
        }

        info!(
            "Session created for \"{}\" ({} bytes ROM, 0x{:X} bytes RAM at 0x{:08X})",
            bus.rom.name(),
            bus.rom.len(),
            config.ram_size,
            config.ram_base
        );

        Ok(Self {
            scene: SceneManager::new(&config),
            overlays: OverlayRegistry::new(overlays),
            stage_state: ActiveStageState::new(),
            current_stage: None,
            segments,
            bus,
            config,
        })
    }

    /// Builds a session from a ROM file and binary descriptor tables
    pub fn from_images<P: AsRef<Path>>(
        config: OverlayConfig,
        rom_path: P,
        segment_image: &[u8],
        overlay_image: &[u8],
    ) -> SessionResult<Self> {
        let rom = Rom::load_from_file(rom_path, config.max_rom_size)?;
        let segments = SegmentTable::from_image(segment_image)?;
        let overlays = OverlayTable::from_image(overlay_image)?;
        Self::new(config, rom, segments, overlays)
    }

    pub fn with_relocator(mut self, relocator: Box<dyn Relocator + Send>) -> Self {
        self.overlays.set_relocator(relocator);
        self
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn bus(&self) -> &MemoryBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut MemoryBus {
        &mut self.bus
    }

    pub fn segments(&self) -> &SegmentTable {
        &self.segments
    }

    pub fn overlays(&self) -> &OverlayRegistry {
        &self.overlays
    }

    /// Loads the resources of stage `index`
    pub fn select_stage(&mut self, index: i32) -> SessionResult<StageLoadReport> {
        let stage = StageId::try_from(index)?;
        let previous = self.current_stage.take();

        match stage::select_stage(stage, &mut self.overlays, &self.segments, &mut self.bus) {
            Ok(report) => {
                self.current_stage = Some(stage);
                Ok(report)
            }
            Err(e) => {
                // A half-loaded stage is no stage; keep the old one only if untouched
                self.current_stage = previous.filter(|&p| self.stage_resident(p));
                Err(e.into())
            }
        }
    }

    fn stage_resident(&self, stage: StageId) -> bool {
        let resources = stage.resources();
        self.overlays.is_resident(resources.overlay, &self.bus)
            && self
                .bus
                .windows
                .is_resident(WindowOwner::Segment(resources.extra))
    }

    pub fn current_stage(&self) -> Option<StageId> {
        self.current_stage
    }

    pub fn load_overlay(&mut self, id: OverlayId) -> SessionResult<OverlayLoad> {
        Ok(self.overlays.load_overlay(id, &mut self.bus)?)
    }

    pub fn load_segment(&mut self, id: SegmentId) -> SessionResult<SegmentLoad> {
        Ok(self.bus.load_segment(self.segments.get(id))?)
    }

    /// Decompresses ROM data at `rom_addr` into RAM at `ram_addr`
    pub fn load_compressed(
        &mut self,
        rom_addr: u32,
        ram_addr: u32,
        inflater: &mut dyn Inflater,
    ) -> SessionResult<usize> {
        Ok(self.bus.load_compressed(rom_addr, ram_addr, inflater)?)
    }

    /// Entry point of a resident overlay
    pub fn entry_point(&self, id: OverlayId) -> Option<u32> {
        self.overlays.entry_point(id, &self.bus)
    }

    pub fn set_stage_mode(&mut self, mode: i32) {
        self.stage_state.set_stage_mode(mode);
    }

    pub fn get_stage_mode(&self) -> i32 {
        self.stage_state.get_stage_mode()
    }

    pub fn set_stage_flag(&mut self, flag: i32) {
        self.stage_state.set_stage_flag(flag);
    }

    pub fn get_stage_flag(&self) -> i32 {
        self.stage_state.get_stage_flag()
    }

    pub fn scene_state(&self) -> &SceneState {
        self.scene.state()
    }

    pub fn scene_reloads(&self) -> u64 {
        self.scene.reloads()
    }

    /// One scene manager iteration
    pub fn step_scene_manager(&mut self, scene: &mut dyn SceneStep) -> SceneState {
        self.scene
            .step(&mut self.overlays, &mut self.bus, scene)
            .clone()
    }

    /// Runs the scene manager to a terminal state
    pub fn run_scene_manager(&mut self, scene: &mut dyn SceneStep) -> SceneState {
        self.scene.run(&mut self.overlays, &mut self.bus, scene)
    }

    /// Restarts the scene manager and clears RAM and window ownership
    pub fn reset(&mut self) {
        self.bus.reset();
        self.scene = SceneManager::new(&self.config);
        self.stage_state = ActiveStageState::new();
        self.current_stage = None;
        info!("Session reset");
    }
}

/// Session shared between threads; every operation holds the lock
#[derive(Clone)]
pub struct SharedSession(Arc<Mutex<GameSession>>);

impl SharedSession {
    pub fn new(session: GameSession) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    /// Runs `f` with exclusive access to the session
    pub fn with<R>(&self, f: impl FnOnce(&mut GameSession) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }

    pub fn select_stage(&self, index: i32) -> SessionResult<StageLoadReport> {
        self.with(|s| s.select_stage(index))
    }

    pub fn load_overlay(&self, id: OverlayId) -> SessionResult<OverlayLoad> {
        self.with(|s| s.load_overlay(id))
    }

    pub fn set_stage_mode(&self, mode: i32) {
        self.with(|s| s.set_stage_mode(mode))
    }

    pub fn get_stage_mode(&self) -> i32 {
        self.with(|s| s.get_stage_mode())
    }

    pub fn set_stage_flag(&self, flag: i32) {
        self.with(|s| s.set_stage_flag(flag))
    }

    pub fn get_stage_flag(&self) -> i32 {
        self.with(|s| s.get_stage_flag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dma::stream::tests::{stored_image, StoredInflater};
    use crate::core::fixtures;
    use crate::core::scene::{HaltCause, StepStatus};
    use crate::core::stage::LoadEvent;
    use std::thread;

    #[test]
    fn test_select_stage_and_reject_unknown() {
        let mut session = fixtures::session();

        let report = session.select_stage(3).unwrap();
        assert_eq!(report.stage, StageId::Stage3);
        assert_eq!(report.events[0], LoadEvent::Overlay(OverlayId::Stage3));
        assert_eq!(session.current_stage(), Some(StageId::Stage3));
        assert_eq!(session.entry_point(OverlayId::Stage3), Some(report.entry_point));

        let transfers = session.bus().dma.transfers();
        assert!(matches!(
            session.select_stage(7),
            Err(SessionError::Stage(StageError::UnknownStage(7)))
        ));
        assert_eq!(session.bus().dma.transfers(), transfers);
        assert_eq!(session.current_stage(), Some(StageId::Stage3));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let layout = fixtures::layout();
        let config = OverlayConfig {
            stream_chunk_size: 0,
            ..OverlayConfig::default()
        };
        let result = GameSession::new(
            config,
            Rom::from_bytes(layout.rom_image.clone()),
            layout.segments,
            layout.overlays,
        );
        assert!(matches!(
            result,
            Err(SessionError::Config(ConfigError::Zero("stream_chunk_size")))
        ));
    }

    #[test]
    fn test_stage_fields() {
        let mut session = fixtures::session();
        session.set_stage_mode(4);
        session.set_stage_flag(1);
        assert_eq!((session.get_stage_mode(), session.get_stage_flag()), (4, 1));
        session.set_stage_flag(0);
        assert_eq!(session.get_stage_mode(), 4);
    }

    #[test]
    fn test_scene_manager_through_session() {
        let mut session = fixtures::session();
        let state = session.run_scene_manager(&mut |counter: u32| StepStatus::from((counter == 3) as i32));
        assert_eq!(
            state,
            SceneState::HaltedError {
                counter: 3,
                cause: HaltCause::StepFailed(1)
            }
        );
        assert_eq!(session.scene_reloads(), 8);

        // Parado: nenhuma iteração adicional
        let again = session.step_scene_manager(&mut |_: u32| StepStatus::Continue);
        assert_eq!(again, state);
        assert_eq!(session.scene_reloads(), 8);

        session.reset();
        assert_eq!(session.scene_state(), &SceneState::Running(0));
        assert!(session.bus().windows.residents().next().is_none());
    }

    #[test]
    fn test_load_segment_and_compressed() {
        let mut session = fixtures::session();
        let load = session.load_segment(SegmentId::Bulbasaur2).unwrap();
        assert!(load.evicted.is_empty());
        assert!(session
            .bus()
            .windows
            .is_resident(WindowOwner::Segment(SegmentId::Bulbasaur2)));

        // Dados comprimidos no fim da ROM
        let payload = vec![0xA5; 0x30];
        let mut rom = fixtures::layout().rom_image;
        let at = rom.len() as u32;
        rom.extend(stored_image(&payload));
        let layout = fixtures::layout();
        let mut session =
            GameSession::new(OverlayConfig::default(), Rom::from_bytes(rom), layout.segments, layout.overlays)
                .unwrap();
        assert_eq!(session.load_compressed(at, 0x8060_0000, &mut StoredInflater).unwrap(), 0x30);
        assert_eq!(session.bus().ram.read(0x8060_0000, 0x30).unwrap(), &payload[..]);
    }

    #[test]
    fn test_save_memory_attached_by_default() {
        let mut session = fixtures::session();
        session.bus_mut().ram.write(0x8000_4000, b"PKMN").unwrap();
        session.bus_mut().dma_save_write(0x8000_4000, 0, 4).unwrap();
        let save = session.bus().save.as_ref().unwrap();
        assert_eq!(&save.data[..4], b"PKMN");
        assert!(save.dirty);
    }

    #[test]
    fn test_shared_session_serialises_stage_loads() {
        let shared = SharedSession::new(fixtures::session());

        let handles: Vec<_> = (0..7)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    shared.select_stage(i).unwrap();
                    shared.set_stage_mode(i);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        shared.with(|s| {
            // Uma única fase residente na janela compartilhada
            let resident: Vec<_> = s
                .overlays()
                .resident(s.bus())
                .into_iter()
                .filter(|id| *id < OverlayId::ManagerA)
                .collect();
            assert_eq!(resident.len(), 1);
            let current = s.current_stage().unwrap();
            assert_eq!(resident[0].index(), current.index());
            assert_eq!(s.overlays().load_count(), 7);
        });
        assert!((0..7).contains(&shared.get_stage_mode()));
    }

    #[test]
    fn test_failed_stage_load_clears_current_stage() {
        let layout = fixtures::layout();
        // stage5_extra fora da RDRAM (8MB a partir de 0x80000000)
        let segments = SegmentTable::new(layout.segments.iter().map(|d| {
            let mut d = *d;
            if d.id == SegmentId::Stage5Extra {
                d.ram_dest = 0x8100_0000;
            }
            d
        }))
        .unwrap();
        let rom = Rom::load_from_buffer(&layout.rom_image, usize::MAX).unwrap();
        let mut session = GameSession::new(OverlayConfig::default(), rom, segments, layout.overlays).unwrap();

        session.select_stage(3).unwrap();
        assert!(matches!(
            session.select_stage(5),
            Err(SessionError::Stage(StageError::Dma(DmaError::Memory(
                MemoryError::RamOutOfBounds { .. }
            ))))
        ));
        assert_eq!(session.current_stage(), None);
        assert_eq!(session.entry_point(OverlayId::Stage3), None);

        session.select_stage(2).unwrap();
        assert_eq!(session.current_stage(), Some(StageId::Stage2));
    }

    #[test]
    fn test_from_images() {
        let layout = fixtures::layout();
        let path = std::env::temp_dir().join(format!("snap_overlay_rom_{}.z64", std::process::id()));
        std::fs::write(&path, &layout.rom_image).unwrap();

        let mut session = GameSession::from_images(
            OverlayConfig::default(),
            &path,
            &layout.segments.to_image(),
            &layout.overlays.to_image(),
        )
        .unwrap();
        assert_eq!(session.bus().rom.name(), "POKEMON SNAP");
        let report = session.select_stage(1).unwrap();
        assert_eq!(report.events.len(), 8);

        let truncated = layout.overlays.to_image();
        let result = GameSession::from_images(
            OverlayConfig::default(),
            &path,
            &layout.segments.to_image(),
            &truncated[..truncated.len() - 1],
        );
        assert!(matches!(result, Err(SessionError::Table(TableError::TruncatedImage { .. }))));

        let _ = std::fs::remove_file(&path);
    }
}
