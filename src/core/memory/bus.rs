//! Barramento de memória principal.
//! Junta a ROM, a RDRAM, a Save RAM opcional, o controlador DMA e o mapa
//! de janelas; é aqui que os segmentos são copiados para suas janelas.

use crate::core::config::OverlayConfig;
use crate::core::dma::{self, DmaController, DmaError, DmaResult, DmaTransfer, Inflater};
use crate::core::memory::map::{WindowMap, WindowOwner};
use crate::core::memory::ram::Ram;
use crate::core::memory::rom::Rom;
use crate::core::memory::save::SaveMemory;
use crate::core::overlay::SegmentDescriptor;
use log::debug;

/// Resultado do carregamento de um segmento
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLoad {
    pub transfer: DmaTransfer,
    pub evicted: Vec<WindowOwner>,
}

/// Barramento de memória principal
pub struct MemoryBus {
    pub rom: Rom,
    pub ram: Ram,
    pub save: Option<SaveMemory>,
    pub dma: DmaController,
    pub windows: WindowMap,
    stream_chunk_size: usize,
}

impl MemoryBus {
    /// Cria um novo barramento com a ROM do cartucho
    pub fn new(rom: Rom, config: &OverlayConfig) -> Self {
        Self {
            rom,
            ram: Ram::new(config.ram_base, config.ram_size),
            save: None,
            dma: DmaController::new(config.dma_block_size),
            windows: WindowMap::new(),
            stream_chunk_size: config.stream_chunk_size,
        }
    }

    /// Conecta uma Save RAM ao barramento PI
    pub fn attach_save(&mut self, save: SaveMemory) {
        self.save = Some(save);
    }

    /// Copia exatamente `rom_end - rom_start` bytes para `ram_dest` e
    /// registra o segmento como ocupante da janela.
    pub fn load_segment(&mut self, descriptor: &SegmentDescriptor) -> DmaResult<SegmentLoad> {
        let transfer = self.dma.read_device(
            &self.rom,
            descriptor.rom_start,
            &mut self.ram,
            descriptor.ram_dest,
            descriptor.len(),
        )?;
        let evicted = self
            .windows
            .claim(descriptor.window(), WindowOwner::Segment(descriptor.id));

        debug!(
            "Segmento {} carregado: ROM 0x{:08X}..0x{:08X} -> {}",
            descriptor.name(),
            descriptor.rom_start,
            descriptor.rom_end,
            descriptor.window()
        );

        Ok(SegmentLoad { transfer, evicted })
    }

    /// Leitura direta ROM -> RDRAM
    pub fn dma_rom_read(&mut self, rom_addr: u32, ram_addr: u32, len: u32) -> DmaResult<DmaTransfer> {
        self.dma.read_device(&self.rom, rom_addr, &mut self.ram, ram_addr, len)
    }

    /// Escrita RDRAM -> Save RAM
    pub fn dma_save_write(&mut self, ram_addr: u32, dev_addr: u32, len: u32) -> DmaResult<DmaTransfer> {
        let save = self.save.as_mut().ok_or(DmaError::NoDevice("save RAM"))?;
        self.dma.write_device(save, dev_addr, &self.ram, ram_addr, len)
    }

    /// Leitura Save RAM -> RDRAM
    pub fn dma_save_read(&mut self, dev_addr: u32, ram_addr: u32, len: u32) -> DmaResult<DmaTransfer> {
        let save = self.save.as_ref().ok_or(DmaError::NoDevice("save RAM"))?;
        self.dma.read_device(save, dev_addr, &mut self.ram, ram_addr, len)
    }

    /// Descomprime dados da ROM para a RDRAM
    pub fn load_compressed(&mut self, rom_addr: u32, ram_addr: u32, inflater: &mut dyn Inflater) -> DmaResult<usize> {
        dma::load_compressed(
            &mut self.dma,
            &self.rom,
            rom_addr,
            &mut self.ram,
            ram_addr,
            self.stream_chunk_size,
            inflater,
        )
    }

    /// Reseta o barramento (RAM zerada, janelas livres)
    pub fn reset(&mut self) {
        self.ram.reset();
        self.windows.clear();
    }
}
