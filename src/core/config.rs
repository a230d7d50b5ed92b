//! Configuração do gerenciador de overlays.

use crate::core::dma::stream::STREAM_CHUNK_SIZE;
use crate::core::dma::DMA_BLOCK_SIZE;
use crate::core::memory::{DEFAULT_RAM_SIZE, DEFAULT_SAVE_SIZE, KSEG0_BASE, MAX_ROM_SIZE};
use crate::core::overlay::OverlayId;
use thiserror::Error;

/// Número de iterações do gerenciador de cenas antes da parada
pub const SCENE_ITERATION_LIMIT: u32 = 0x11;

/// Erros de configuração
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be non-zero")]
    Zero(&'static str),

    #[error("RAM 0x{base:08X}+0x{size:X} overflows the address space")]
    RamOverflow { base: u32, size: usize },

    #[error("scene manager overlays must differ (both are {0})")]
    SameManagers(OverlayId),
}

/// Configuração geral
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Endereço VRAM do início da RDRAM
    pub ram_base: u32,
    /// Tamanho da RDRAM em bytes
    pub ram_size: usize,
    /// Tamanho máximo de um bloco DMA
    pub dma_block_size: u32,
    /// Tamanho do buffer de estágio para dados comprimidos
    pub stream_chunk_size: usize,
    /// Limite do contador do gerenciador de cenas
    pub scene_iteration_limit: u32,
    /// Overlays recarregados a cada iteração, nesta ordem
    pub scene_managers: [OverlayId; 2],
    /// Maior ROM aceita
    pub max_rom_size: usize,
    /// Tamanho da Save RAM (0 = sem Save RAM)
    pub save_size: usize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            ram_base: KSEG0_BASE,
            ram_size: DEFAULT_RAM_SIZE,
            dma_block_size: DMA_BLOCK_SIZE,
            stream_chunk_size: STREAM_CHUNK_SIZE,
            scene_iteration_limit: SCENE_ITERATION_LIMIT,
            scene_managers: [OverlayId::ManagerA, OverlayId::ManagerB],
            max_rom_size: MAX_ROM_SIZE,
            save_size: DEFAULT_SAVE_SIZE,
        }
    }
}

impl OverlayConfig {
    /// Verifica a consistência dos valores
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ram_size == 0 {
            return Err(ConfigError::Zero("ram_size"));
        }
        if self.dma_block_size == 0 {
            return Err(ConfigError::Zero("dma_block_size"));
        }
        if self.stream_chunk_size == 0 {
            return Err(ConfigError::Zero("stream_chunk_size"));
        }
        if self.max_rom_size == 0 {
            return Err(ConfigError::Zero("max_rom_size"));
        }
        if self.ram_base as u64 + self.ram_size as u64 > u32::MAX as u64 + 1 {
            return Err(ConfigError::RamOverflow {
                base: self.ram_base,
                size: self.ram_size,
            });
        }
        if self.scene_managers[0] == self.scene_managers[1] {
            return Err(ConfigError::SameManagers(self.scene_managers[0]));
        }
        Ok(())
    }
}
