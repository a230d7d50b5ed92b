//! Sistema de Memória do console.
//! Gerencia a ROM do cartucho, a RDRAM endereçada por VRAM (KSEG0),
//! o mapa de janelas de overlay e a Save RAM.

pub mod bus;
pub mod map;
pub mod ram;
pub mod rom;
pub mod save;

// Re-exportações para facilitar o uso
pub use bus::{MemoryBus, SegmentLoad};
pub use map::{Window, WindowMap, WindowOwner};
pub use ram::Ram;
pub use rom::{ByteOrder, Rom};
pub use save::SaveMemory;

use thiserror::Error;

/// Base do segmento KSEG0 (endereços VRAM com cache)
pub const KSEG0_BASE: u32 = 0x8000_0000;

/// Máscara de endereço físico (remove os bits de segmento KSEG0/KSEG1)
pub const PHYS_MASK: u32 = 0x1FFF_FFFF;

/// Tamanho padrão da RDRAM (8MB com Expansion Pak)
pub const DEFAULT_RAM_SIZE: usize = 0x80_0000;

/// Tamanho máximo de ROM suportado (64MB)
pub const MAX_ROM_SIZE: usize = 64 * 1024 * 1024;

/// Tamanho do cabeçalho da ROM
pub const ROM_HEADER_SIZE: usize = 0x40;

/// Tamanho padrão da Save RAM (32KB)
pub const DEFAULT_SAVE_SIZE: usize = 0x8000;

/// Erros do sistema de memória
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("ROM too large: {size} bytes (max {max})")]
    RomTooLarge { size: usize, max: usize },

    #[error("ROM too small: {size} bytes, header needs {ROM_HEADER_SIZE}")]
    RomTooSmall { size: usize },

    #[error("device range 0x{addr:08X}+0x{len:X} out of bounds (device size 0x{size:X})")]
    DeviceOutOfBounds { addr: u32, len: usize, size: usize },

    #[error("RAM range 0x{addr:08X}+0x{len:X} outside RDRAM 0x{base:08X}+0x{size:X}")]
    RamOutOfBounds { addr: u32, len: usize, base: u32, size: usize },

    #[error("device is read-only (write at 0x{addr:08X})")]
    ReadOnly { addr: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tipo de resultado para operações de memória
pub type MemoryResult<T> = Result<T, MemoryError>;
