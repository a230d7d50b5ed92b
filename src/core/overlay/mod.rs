// snap-overlay-rs/src/core/overlay/mod.rs

//! Overlay and segment descriptors
//!
//! A *segment* is a contiguous ROM range copied verbatim into a fixed RAM
//! window. An *overlay* is a segment that carries code: it has text, data
//! and bss ranges, needs cache maintenance on load and exposes an entry
//! point once resident.

pub mod registry;
pub mod table;

pub use registry::{NoRelocation, OverlayLoad, OverlayRegistry, Relocator};
pub use table::{OverlayTable, SegmentTable};

use crate::core::dma::DmaError;
use crate::core::memory::{MemoryError, Window};
use std::fmt;
use thiserror::Error;

/// Every loadable data segment known to the executable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentId {
    Magikarp1,
    Magikarp2,
    Pikachu1,
    Pikachu2,
    Zubat1,
    Zubat2,
    Bulbasaur1,
    Bulbasaur2,
    Stage0Extra,
    Stage1Extra,
    Stage2Extra,
    Stage3Extra,
    Stage4Extra,
    Stage5Extra,
    Stage6Extra,
}

impl SegmentId {
    pub const COUNT: usize = 15;

    /// Table order (also the order of entries in a binary table image)
    pub const ALL: [SegmentId; Self::COUNT] = [
        SegmentId::Magikarp1,
        SegmentId::Magikarp2,
        SegmentId::Pikachu1,
        SegmentId::Pikachu2,
        SegmentId::Zubat1,
        SegmentId::Zubat2,
        SegmentId::Bulbasaur1,
        SegmentId::Bulbasaur2,
        SegmentId::Stage0Extra,
        SegmentId::Stage1Extra,
        SegmentId::Stage2Extra,
        SegmentId::Stage3Extra,
        SegmentId::Stage4Extra,
        SegmentId::Stage5Extra,
        SegmentId::Stage6Extra,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Link-time symbol name
    pub fn name(self) -> &'static str {
        match self {
            SegmentId::Magikarp1 => "magikarp1",
            SegmentId::Magikarp2 => "magikarp2",
            SegmentId::Pikachu1 => "pikachu1",
            SegmentId::Pikachu2 => "pikachu2",
            SegmentId::Zubat1 => "zubat1",
            SegmentId::Zubat2 => "zubat2",
            SegmentId::Bulbasaur1 => "bulbasaur1",
            SegmentId::Bulbasaur2 => "bulbasaur2",
            SegmentId::Stage0Extra => "stage0_extra",
            SegmentId::Stage1Extra => "stage1_extra",
            SegmentId::Stage2Extra => "stage2_extra",
            SegmentId::Stage3Extra => "stage3_extra",
            SegmentId::Stage4Extra => "stage4_extra",
            SegmentId::Stage5Extra => "stage5_extra",
            SegmentId::Stage6Extra => "stage6_extra",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every code overlay known to the executable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OverlayId {
    Stage0,
    Stage1,
    Stage2,
    Stage3,
    Stage4,
    Stage5,
    Stage6,
    /// First overlay reloaded by the scene manager each iteration
    ManagerA,
    /// Second overlay reloaded by the scene manager each iteration
    ManagerB,
}

impl OverlayId {
    pub const COUNT: usize = 9;

    pub const ALL: [OverlayId; Self::COUNT] = [
        OverlayId::Stage0,
        OverlayId::Stage1,
        OverlayId::Stage2,
        OverlayId::Stage3,
        OverlayId::Stage4,
        OverlayId::Stage5,
        OverlayId::Stage6,
        OverlayId::ManagerA,
        OverlayId::ManagerB,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            OverlayId::Stage0 => "stage0",
            OverlayId::Stage1 => "stage1",
            OverlayId::Stage2 => "stage2",
            OverlayId::Stage3 => "stage3",
            OverlayId::Stage4 => "stage4",
            OverlayId::Stage5 => "stage5",
            OverlayId::Stage6 => "stage6",
            OverlayId::ManagerA => "manager_a",
            OverlayId::ManagerB => "manager_b",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while building descriptor tables
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("{name}: invalid range 0x{start:08X}..0x{end:08X}")]
    InvalidRange { name: &'static str, start: u32, end: u32 },

    #[error("{name}: RAM window 0x{start:08X}+0x{len:X} overflows the address space")]
    WindowOverflow { name: &'static str, start: u32, len: u32 },

    #[error("segment table has no entry for {0}")]
    MissingSegment(SegmentId),

    #[error("segment table has two entries for {0}")]
    DuplicateSegment(SegmentId),

    #[error("overlay table has no entry for {0}")]
    MissingOverlay(OverlayId),

    #[error("overlay table has two entries for {0}")]
    DuplicateOverlay(OverlayId),

    #[error("no descriptor named \"{0}\"")]
    UnknownName(String),

    #[error("table image truncated: expected {expected} bytes, got {actual}")]
    TruncatedImage { expected: usize, actual: usize },
}

pub type TableResult<T> = Result<T, TableError>;

/// Errors raised while binding an overlay
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("overlay DMA failed: {0}")]
    Dma(#[from] DmaError),

    #[error("overlay memory access failed: {0}")]
    Memory(#[from] MemoryError),

    #[error("relocation of {overlay} failed: {reason}")]
    Relocation { overlay: OverlayId, reason: String },
}

pub type OverlayResult<T> = Result<T, OverlayError>;

/// A ROM range with a fixed RAM destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentDescriptor {
    pub id: SegmentId,
    pub rom_start: u32,
    pub rom_end: u32,
    pub ram_dest: u32,
}

impl SegmentDescriptor {
    pub fn new(id: SegmentId, rom_start: u32, rom_end: u32, ram_dest: u32) -> TableResult<Self> {
        let descriptor = Self {
            id,
            rom_start,
            rom_end,
            ram_dest,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn validate(&self) -> TableResult<()> {
        if self.rom_end < self.rom_start {
            return Err(TableError::InvalidRange {
                name: self.id.name(),
                start: self.rom_start,
                end: self.rom_end,
            });
        }
        if Window::sized(self.ram_dest, self.len()).is_none() {
            return Err(TableError::WindowOverflow {
                name: self.id.name(),
                start: self.ram_dest,
                len: self.len(),
            });
        }
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    /// Bytes copied by a load
    pub fn len(&self) -> u32 {
        self.rom_end.saturating_sub(self.rom_start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destination window (same size as the ROM range)
    pub fn window(&self) -> Window {
        Window {
            start: self.ram_dest,
            end: self.ram_dest.saturating_add(self.len()),
        }
    }

    /// ROM address backing a VRAM address of this segment
    pub fn vram_to_rom(&self, vram: u32) -> Option<u32> {
        self.window()
            .contains(vram)
            .then(|| self.rom_start + (vram - self.ram_dest))
    }

    /// VRAM address a ROM address of this segment is loaded to
    pub fn rom_to_vram(&self, rom: u32) -> Option<u32> {
        (rom >= self.rom_start && rom < self.rom_end).then(|| self.ram_dest + (rom - self.rom_start))
    }
}

/// A relocatable code unit with text/data/bss sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlay {
    pub id: OverlayId,
    pub rom_start: u32,
    pub rom_end: u32,
    pub vram_start: u32,
    pub text: Window,
    pub data: Window,
    pub bss: Window,
}

impl Overlay {
    pub fn validate(&self) -> TableResult<()> {
        let name = self.id.name();
        if self.rom_end < self.rom_start {
            return Err(TableError::InvalidRange {
                name,
                start: self.rom_start,
                end: self.rom_end,
            });
        }
        for section in [self.text, self.data, self.bss] {
            if section.end < section.start {
                return Err(TableError::InvalidRange {
                    name,
                    start: section.start,
                    end: section.end,
                });
            }
        }
        if Window::sized(self.vram_start, self.rom_len()).is_none() {
            return Err(TableError::WindowOverflow {
                name,
                start: self.vram_start,
                len: self.rom_len(),
            });
        }
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    /// Bytes copied from ROM
    pub fn rom_len(&self) -> u32 {
        self.rom_end.saturating_sub(self.rom_start)
    }

    /// Whole RAM window the overlay occupies (loaded image plus bss)
    pub fn window(&self) -> Window {
        let end = [
            self.vram_start.saturating_add(self.rom_len()),
            self.text.end,
            self.data.end,
            self.bss.end,
        ]
        .into_iter()
        .max()
        .unwrap_or(self.vram_start);

        Window {
            start: self.vram_start,
            end: end.max(self.vram_start),
        }
    }

    /// Entry point: start of text, or the load address for data-only overlays
    pub fn entry_point(&self) -> u32 {
        if self.text.is_empty() {
            self.vram_start
        } else {
            self.text.start
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for id in SegmentId::ALL {
            assert_eq!(SegmentId::from_name(id.name()), Some(id));
            assert_eq!(SegmentId::ALL[id.index()], id);
        }
        for id in OverlayId::ALL {
            assert_eq!(OverlayId::from_name(id.name()), Some(id));
            assert_eq!(OverlayId::ALL[id.index()], id);
        }
        assert_eq!(SegmentId::from_name("mewtwo1"), None);
    }

    #[test]
    fn test_segment_descriptor_validation() {
        assert!(SegmentDescriptor::new(SegmentId::Zubat1, 0x200, 0x100, 0x8030_0000).is_err());
        assert!(matches!(
            SegmentDescriptor::new(SegmentId::Zubat1, 0x100, 0x200, 0xFFFF_FF80),
            Err(TableError::WindowOverflow { .. })
        ));

        let seg = SegmentDescriptor::new(SegmentId::Zubat1, 0x1000, 0x1400, 0x8030_0000).unwrap();
        assert_eq!(seg.len(), 0x400);
        assert_eq!(seg.window().end, 0x8030_0400);
        assert_eq!(seg.vram_to_rom(0x8030_0010), Some(0x1010));
        assert_eq!(seg.vram_to_rom(0x8030_0400), None);
        assert_eq!(seg.rom_to_vram(0x13FF), Some(0x8030_03FF));
        assert_eq!(seg.rom_to_vram(0x0FFF), None);
    }

    #[test]
    fn test_overlay_window_includes_bss() {
        let overlay = Overlay {
            id: OverlayId::Stage2,
            rom_start: 0x2000,
            rom_end: 0x2200,
            vram_start: 0x802D_0000,
            text: Window { start: 0x802D_0000, end: 0x802D_0180 },
            data: Window { start: 0x802D_0180, end: 0x802D_0200 },
            bss: Window { start: 0x802D_0200, end: 0x802D_0300 },
        };
        overlay.validate().unwrap();
        assert_eq!(overlay.window(), Window { start: 0x802D_0000, end: 0x802D_0300 });
        assert_eq!(overlay.entry_point(), 0x802D_0000);
    }

    #[test]
    fn test_overlay_rejects_inverted_section() {
        let overlay = Overlay {
            id: OverlayId::ManagerA,
            rom_start: 0,
            rom_end: 0x10,
            vram_start: 0x8010_0000,
            text: Window { start: 0x8010_0010, end: 0x8010_0000 },
            data: Window { start: 0, end: 0 },
            bss: Window { start: 0, end: 0 },
        };
        assert!(matches!(overlay.validate(), Err(TableError::InvalidRange { .. })));
    }
}
