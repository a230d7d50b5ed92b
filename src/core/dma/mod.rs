//! Controlador DMA da interface paralela (PI).
//!
//! Copia intervalos entre um dispositivo PI (ROM do cartucho, Save RAM) e a
//! RDRAM em blocos de no máximo `block_size` bytes. Cada bloco termina antes
//! do próximo começar; a chamada só retorna com o destino completo.

pub mod stream;

pub use stream::{load_compressed, ChunkSource, DmaStream, Inflater};

use crate::core::memory::{MemoryError, MemoryResult, Ram};
use bitflags::bitflags;
use log::warn;
use thiserror::Error;

/// Tamanho padrão de um bloco DMA
pub const DMA_BLOCK_SIZE: u32 = 0x10000;

bitflags! {
    /// Operações de cache executadas em torno de uma transferência
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CacheOps: u8 {
        const INVALIDATE_ICACHE = 0b001;
        const INVALIDATE_DCACHE = 0b010;
        const WRITEBACK_DCACHE  = 0b100;
    }
}

/// Direção da transferência
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaDirection {
    DeviceToRam, // leitura (ROM -> RDRAM)
    RamToDevice, // escrita (RDRAM -> Save RAM)
}

/// Dispositivo no barramento PI
pub trait PiDevice {
    /// Nome para logs
    fn name(&self) -> &str;

    /// Tamanho endereçável em bytes
    fn size(&self) -> usize;

    /// Lê `buf.len()` bytes a partir de `addr`
    fn read(&self, addr: u32, buf: &mut [u8]) -> MemoryResult<()>;

    /// Escreve `data` a partir de `addr`
    fn write(&mut self, addr: u32, data: &[u8]) -> MemoryResult<()>;
}

/// Erros de DMA
#[derive(Debug, Error)]
pub enum DmaError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("stream reached end of {device} at 0x{addr:08X}")]
    EndOfDevice { device: String, addr: u32 },

    #[error("decompression failed: {0}")]
    Inflate(String),

    #[error("no {0} attached to the PI bus")]
    NoDevice(&'static str),
}

/// Tipo de resultado para operações de DMA
pub type DmaResult<T> = Result<T, DmaError>;

/// Registro de uma transferência concluída
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaTransfer {
    pub direction: DmaDirection,
    pub dev_addr: u32,
    /// `None` quando o destino é um buffer fora da RDRAM
    pub ram_addr: Option<u32>,
    pub len: u32,
    pub blocks: u32,
    pub cache: CacheOps,
    pub suppressed: bool,
}

/// Controlador DMA síncrono
#[derive(Debug)]
pub struct DmaController {
    block_size: u32,
    suppressed: bool,
    transfers: u64,
    bytes: u64,
}

impl DmaController {
    pub fn new(block_size: u32) -> Self {
        let block_size = if block_size == 0 {
            warn!("Tamanho de bloco DMA zero, usando 0x{:X}", DMA_BLOCK_SIZE);
            DMA_BLOCK_SIZE
        } else {
            block_size
        };

        Self {
            block_size,
            suppressed: false,
            transfers: 0,
            bytes: 0,
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Quando suprimido, os blocos são "concluídos" sem mover bytes
    pub fn set_suppressed(&mut self, suppressed: bool) {
        if suppressed {
            warn!("DMA suprimido: transferências não moverão dados");
        }
        self.suppressed = suppressed;
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Número de transferências concluídas
    pub fn transfers(&self) -> u64 {
        self.transfers
    }

    /// Bytes efetivamente copiados
    pub fn bytes_copied(&self) -> u64 {
        self.bytes
    }

    /// Dispositivo -> RDRAM
    pub fn read_device(
        &mut self,
        device: &dyn PiDevice,
        dev_addr: u32,
        ram: &mut Ram,
        ram_addr: u32,
        len: u32,
    ) -> DmaResult<DmaTransfer> {
        check_device_range(device, dev_addr, len)?;
        let dst = ram.slice_mut(ram_addr, len as usize)?;
        let mut transfer = self.copy_in(device, dev_addr, dst)?;
        transfer.ram_addr = Some(ram_addr);
        Ok(transfer)
    }

    /// Dispositivo -> buffer externo (buffer de estágio do stream)
    pub fn read_into(&mut self, device: &dyn PiDevice, dev_addr: u32, buf: &mut [u8]) -> DmaResult<DmaTransfer> {
        check_device_range(device, dev_addr, buf.len() as u32)?;
        self.copy_in(device, dev_addr, buf)
    }

    /// RDRAM -> dispositivo
    pub fn write_device(
        &mut self,
        device: &mut dyn PiDevice,
        dev_addr: u32,
        ram: &Ram,
        ram_addr: u32,
        len: u32,
    ) -> DmaResult<DmaTransfer> {
        check_device_range(device, dev_addr, len)?;
        let src = ram.read(ram_addr, len as usize)?;

        let mut blocks = 0;
        for (i, chunk) in src.chunks(self.block_size as usize).enumerate() {
            let offset = i as u32 * self.block_size;
            if !self.suppressed {
                device.write(dev_addr + offset, chunk)?;
                self.bytes += chunk.len() as u64;
            }
            trace_block(DmaDirection::RamToDevice, dev_addr + offset, chunk.len());
            blocks += 1;
        }
        self.transfers += 1;

        Ok(DmaTransfer {
            direction: DmaDirection::RamToDevice,
            dev_addr,
            ram_addr: Some(ram_addr),
            len,
            blocks,
            cache: CacheOps::WRITEBACK_DCACHE,
            suppressed: self.suppressed,
        })
    }

    fn copy_in(&mut self, device: &dyn PiDevice, dev_addr: u32, dst: &mut [u8]) -> DmaResult<DmaTransfer> {
        let len = dst.len() as u32;
        let mut blocks = 0;

        for (i, chunk) in dst.chunks_mut(self.block_size as usize).enumerate() {
            let offset = i as u32 * self.block_size;
            if !self.suppressed {
                device.read(dev_addr + offset, chunk)?;
                self.bytes += chunk.len() as u64;
            }
            trace_block(DmaDirection::DeviceToRam, dev_addr + offset, chunk.len());
            blocks += 1;
        }
        self.transfers += 1;

        Ok(DmaTransfer {
            direction: DmaDirection::DeviceToRam,
            dev_addr,
            ram_addr: None,
            len,
            blocks,
            cache: CacheOps::INVALIDATE_DCACHE,
            suppressed: self.suppressed,
        })
    }
}

impl Default for DmaController {
    fn default() -> Self {
        Self::new(DMA_BLOCK_SIZE)
    }
}

fn check_device_range(device: &dyn PiDevice, addr: u32, len: u32) -> MemoryResult<()> {
    let end = addr as usize + len as usize;
    if end > device.size() {
        return Err(MemoryError::DeviceOutOfBounds {
            addr,
            len: len as usize,
            size: device.size(),
        });
    }
    Ok(())
}

cfg_if::cfg_if! {
    if #[cfg(feature = "trace-dma")] {
        fn trace_block(direction: DmaDirection, dev_addr: u32, len: usize) {
            log::trace!("DMA {:?} bloco dev=0x{:08X} len=0x{:X}", direction, dev_addr, len);
        }
    } else {
        #[inline(always)]
        fn trace_block(_direction: DmaDirection, _dev_addr: u32, _len: usize) {}
    }
}
