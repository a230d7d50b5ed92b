//! RDRAM endereçada por VRAM.
//! Endereços KSEG0 (0x8xxxxxxx) e KSEG1 (0xAxxxxxxx) são espelhos do
//! mesmo endereço físico.

use crate::core::memory::{MemoryError, MemoryResult, PHYS_MASK};

/// Memória principal
pub struct Ram {
    base: u32,
    data: Vec<u8>,
}

impl Ram {
    /// Cria uma RDRAM zerada de `size` bytes começando em `base`
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            data: vec![0; size],
        }
    }

    /// Endereço VRAM inicial
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Converte um intervalo VRAM em offset no buffer
    fn offset(&self, addr: u32, len: usize) -> MemoryResult<usize> {
        let phys = (addr & PHYS_MASK) as usize;
        let base = (self.base & PHYS_MASK) as usize;

        phys.checked_sub(base)
            .filter(|off| off.checked_add(len).map_or(false, |end| end <= self.data.len()))
            .ok_or(MemoryError::RamOutOfBounds {
                addr,
                len,
                base: self.base,
                size: self.data.len(),
            })
    }

    /// Lê um intervalo
    pub fn read(&self, addr: u32, len: usize) -> MemoryResult<&[u8]> {
        let off = self.offset(addr, len)?;
        Ok(&self.data[off..off + len])
    }

    /// Acesso mutável a um intervalo (destino de DMA)
    pub fn slice_mut(&mut self, addr: u32, len: usize) -> MemoryResult<&mut [u8]> {
        let off = self.offset(addr, len)?;
        Ok(&mut self.data[off..off + len])
    }

    /// Escreve um intervalo
    pub fn write(&mut self, addr: u32, data: &[u8]) -> MemoryResult<()> {
        self.slice_mut(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// Zera um intervalo (bss)
    pub fn zero(&mut self, addr: u32, len: usize) -> MemoryResult<()> {
        self.slice_mut(addr, len)?.fill(0);
        Ok(())
    }

    /// Lê uma palavra de 32 bits (big-endian)
    pub fn read_u32(&self, addr: u32) -> MemoryResult<u32> {
        let bytes = self.read(addr, 4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Escreve uma palavra de 32 bits (big-endian)
    pub fn write_u32(&mut self, addr: u32, value: u32) -> MemoryResult<()> {
        self.write(addr, &value.to_be_bytes())
    }

    /// Reseta a RAM (tudo zero)
    pub fn reset(&mut self) {
        self.data.fill(0);
    }
}
