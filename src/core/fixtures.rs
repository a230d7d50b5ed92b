//! Imagem de ROM sintética e tabelas usadas pelos testes.

use crate::core::config::OverlayConfig;
use crate::core::memory::rom::Z64_MAGIC;
use crate::core::memory::{MemoryBus, Rom, Window};
use crate::core::overlay::{
    Overlay, OverlayId, OverlayTable, SegmentDescriptor, SegmentId, SegmentTable,
};
use crate::core::session::GameSession;

/// Início dos dados depois do cabeçalho e do boot
pub const DATA_START: u32 = 0x1000;

/// Janela compartilhada pelos overlays de fase
pub const STAGE_OVERLAY_VRAM: u32 = 0x802D_0000;

/// Janela compartilhada pelos segmentos extras de fase
pub const STAGE_EXTRA_VRAM: u32 = 0x8030_0000;

/// Janelas das criaturas (uma por segmento, adjacentes)
pub const CREATURE_VRAM: u32 = 0x8020_0000;

pub const MANAGER_A_VRAM: u32 = 0x8010_0000;
pub const MANAGER_B_VRAM: u32 = 0x8011_0000;

const OVERLAY_TEXT: u32 = 0x180;
const OVERLAY_IMAGE: u32 = 0x200;
const OVERLAY_BSS_END: u32 = 0x280;

pub struct Layout {
    pub rom_image: Vec<u8>,
    pub segments: SegmentTable,
    pub overlays: OverlayTable,
}

fn overlay_at(id: OverlayId, rom_start: u32, vram: u32) -> Overlay {
    Overlay {
        id,
        rom_start,
        rom_end: rom_start + OVERLAY_IMAGE,
        vram_start: vram,
        text: Window { start: vram, end: vram + OVERLAY_TEXT },
        data: Window { start: vram + OVERLAY_TEXT, end: vram + OVERLAY_IMAGE },
        bss: Window { start: vram + OVERLAY_IMAGE, end: vram + OVERLAY_BSS_END },
    }
}

/// Monta a ROM e as tabelas
pub fn layout() -> Layout {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut cursor = DATA_START;

    let mut segments = Vec::new();
    for (i, id) in SegmentId::ALL.iter().copied().enumerate() {
        let len = 0x100 + i as u32 * 0x10;
        let ram_dest = if id >= SegmentId::Stage0Extra {
            STAGE_EXTRA_VRAM
        } else {
            CREATURE_VRAM + i as u32 * 0x1000
        };
        segments.push(SegmentDescriptor::new(id, cursor, cursor + len, ram_dest).unwrap());
        cursor += len;
    }

    let mut overlays = Vec::new();
    for id in OverlayId::ALL {
        let vram = match id {
            OverlayId::ManagerA => MANAGER_A_VRAM,
            OverlayId::ManagerB => MANAGER_B_VRAM,
            _ => STAGE_OVERLAY_VRAM,
        };
        overlays.push(overlay_at(id, cursor, vram));
        cursor += OVERLAY_IMAGE;
    }

    // Bytes nunca nulos para que cópias faltando sejam detectadas
    let mut rom_image: Vec<u8> = (0..cursor as usize + 0x100)
        .map(|i| (i % 251) as u8 + 1)
        .collect();
    rom_image[..4].copy_from_slice(&Z64_MAGIC);
    rom_image[0x20..0x34].fill(b' ');
    rom_image[0x20..0x2C].copy_from_slice(b"POKEMON SNAP");

    Layout {
        rom_image,
        segments: SegmentTable::new(segments).unwrap(),
        overlays: OverlayTable::new(overlays).unwrap(),
    }
}

/// Barramento com a ROM do layout e a configuração padrão
pub fn bus(layout: &Layout) -> MemoryBus {
    let rom = Rom::load_from_buffer(&layout.rom_image, usize::MAX).unwrap();
    MemoryBus::new(rom, &OverlayConfig::default())
}

/// Sessão completa sobre o layout
pub fn session() -> GameSession {
    let layout = layout();
    let rom = Rom::load_from_buffer(&layout.rom_image, usize::MAX).unwrap();
    GameSession::new(OverlayConfig::default(), rom, layout.segments, layout.overlays).unwrap()
}
