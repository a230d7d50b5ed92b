// snap-overlay-rs/src/core/overlay/registry.rs

//! Overlay registry
//!
//! Binds overlays into their RAM windows. Binding performs the cache
//! maintenance the firmware does, copies the image, clears bss and hands
//! the result to a relocator. Window ownership is exclusive: binding an
//! overlay evicts whatever overlapped its window.

use crate::core::dma::{CacheOps, DmaTransfer};
use crate::core::memory::{MemoryBus, Ram, Window, WindowOwner};
use crate::core::overlay::{Overlay, OverlayError, OverlayId, OverlayResult, OverlayTable};
use log::{debug, warn};

/// Relocation/fixup step applied after the image is in RAM
pub trait Relocator {
    fn relocate(&mut self, overlay: &Overlay, ram: &mut Ram) -> Result<(), String>;
}

/// Overlays linked at their load address need no fixups
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRelocation;

impl Relocator for NoRelocation {
    fn relocate(&mut self, _overlay: &Overlay, _ram: &mut Ram) -> Result<(), String> {
        Ok(())
    }
}

/// Outcome of binding one overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayLoad {
    pub id: OverlayId,
    pub window: Window,
    pub cache: CacheOps,
    /// `None` when the overlay has no ROM image (bss-only)
    pub transfer: Option<DmaTransfer>,
    pub bss_cleared: u32,
    pub evicted: Vec<WindowOwner>,
}

/// Overlay descriptors plus binding state
pub struct OverlayRegistry {
    table: OverlayTable,
    relocator: Box<dyn Relocator + Send>,
    loads: u64,
    last_bound: Option<OverlayId>,
}

impl OverlayRegistry {
    pub fn new(table: OverlayTable) -> Self {
        Self {
            table,
            relocator: Box::new(NoRelocation),
            loads: 0,
            last_bound: None,
        }
    }

    /// Replaces the relocation step
    pub fn set_relocator(&mut self, relocator: Box<dyn Relocator + Send>) {
        self.relocator = relocator;
    }

    pub fn table(&self) -> &OverlayTable {
        &self.table
    }

    pub fn get(&self, id: OverlayId) -> &Overlay {
        self.table.get(id)
    }

    /// Total successful binds since creation
    pub fn load_count(&self) -> u64 {
        self.loads
    }

    /// Most recently bound overlay
    pub fn last_bound(&self) -> Option<OverlayId> {
        self.last_bound
    }

    /// Binds `id` into its window
    pub fn load_overlay(&mut self, id: OverlayId, bus: &mut MemoryBus) -> OverlayResult<OverlayLoad> {
        let overlay = *self.table.get(id);
        let mut cache = CacheOps::empty();

        if !overlay.text.is_empty() {
            cache |= CacheOps::INVALIDATE_ICACHE | CacheOps::INVALIDATE_DCACHE;
        }
        if !overlay.data.is_empty() {
            cache |= CacheOps::INVALIDATE_DCACHE;
        }

        // bss range checked before the copy
        let bss_cleared = overlay.bss.len();
        if bss_cleared != 0 {
            bus.ram.read(overlay.bss.start, bss_cleared as usize)?;
        }

        let window = overlay.window();
        let transfer = if overlay.rom_len() != 0 {
            Some(bus.dma_rom_read(overlay.rom_start, overlay.vram_start, overlay.rom_len())?)
        } else {
            None
        };

        // Previous occupants are overwritten: unowned from here on, even on failure
        let mut evicted = bus.windows.release(window);
        evicted.retain(|owner| *owner != WindowOwner::Overlay(id));
        for owner in &evicted {
            if let WindowOwner::Overlay(previous) = owner {
                warn!("Overlay {} superseded by {} in {}", previous, id, window);
            }
        }

        if bss_cleared != 0 {
            bus.ram.zero(overlay.bss.start, bss_cleared as usize)?;
        }

        self.relocator
            .relocate(&overlay, &mut bus.ram)
            .map_err(|reason| OverlayError::Relocation { overlay: id, reason })?;

        bus.windows.claim(window, WindowOwner::Overlay(id));

        self.loads += 1;
        self.last_bound = Some(id);
        debug!(
            "Overlay {} bound at {} (ROM 0x{:08X}..0x{:08X}, bss 0x{:X})",
            id, window, overlay.rom_start, overlay.rom_end, bss_cleared
        );

        Ok(OverlayLoad {
            id,
            window,
            cache,
            transfer,
            bss_cleared,
            evicted,
        })
    }

    /// Whether `id` currently owns its window
    pub fn is_resident(&self, id: OverlayId, bus: &MemoryBus) -> bool {
        bus.windows.is_resident(WindowOwner::Overlay(id))
    }

    /// Entry point of `id`, only while it is resident
    pub fn entry_point(&self, id: OverlayId, bus: &MemoryBus) -> Option<u32> {
        self.is_resident(id, bus).then(|| self.table.get(id).entry_point())
    }

    /// All overlays currently bound
    pub fn resident(&self, bus: &MemoryBus) -> Vec<OverlayId> {
        OverlayId::ALL
            .iter()
            .copied()
            .filter(|&id| self.is_resident(id, bus))
            .collect()
    }
}
