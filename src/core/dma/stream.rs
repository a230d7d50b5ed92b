//! Leitura em fluxo da ROM para dados comprimidos.
//!
//! O descompressor é externo (`Inflater`): ele puxa blocos do `DmaStream`
//! conforme precisa. Cada recarga lê o próximo bloco a partir do cursor e
//! avança o cursor pelo tamanho lido.

use crate::core::dma::{DmaController, DmaError, DmaResult, PiDevice};
use crate::core::memory::Ram;
use log::debug;

/// Tamanho padrão do buffer de estágio
pub const STREAM_CHUNK_SIZE: usize = 0x400;

/// Fonte de blocos consumida pelo descompressor
pub trait ChunkSource {
    /// Lê o próximo bloco. Erra com `EndOfDevice` quando não há mais dados.
    fn refill(&mut self) -> DmaResult<&[u8]>;
}

/// Descompressor externo
pub trait Inflater {
    /// Consome blocos de `source` e devolve os dados descomprimidos
    fn inflate(&mut self, source: &mut dyn ChunkSource) -> DmaResult<Vec<u8>>;
}

/// Cursor de leitura DMA com buffer de estágio fixo
pub struct DmaStream<'a> {
    dma: &'a mut DmaController,
    device: &'a dyn PiDevice,
    cursor: u32,
    buffer: Vec<u8>,
    refills: u32,
}

impl<'a> DmaStream<'a> {
    pub fn new(dma: &'a mut DmaController, device: &'a dyn PiDevice, dev_addr: u32, chunk_size: usize) -> Self {
        Self {
            dma,
            device,
            cursor: dev_addr,
            buffer: vec![0; chunk_size.max(1)],
            refills: 0,
        }
    }

    /// Próximo endereço a ser lido
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Quantas recargas já foram feitas
    pub fn refills(&self) -> u32 {
        self.refills
    }
}

impl ChunkSource for DmaStream<'_> {
    fn refill(&mut self) -> DmaResult<&[u8]> {
        let remaining = self.device.size().saturating_sub(self.cursor as usize);
        let len = remaining.min(self.buffer.len());
        if len == 0 {
            return Err(DmaError::EndOfDevice {
                device: self.device.name().to_string(),
                addr: self.cursor,
            });
        }

        self.dma.read_into(self.device, self.cursor, &mut self.buffer[..len])?;
        self.cursor += len as u32;
        self.refills += 1;
        Ok(&self.buffer[..len])
    }
}

/// Descomprime dados da ROM em `dev_addr` para a RDRAM em `ram_addr`.
/// Devolve o número de bytes escritos.
pub fn load_compressed(
    dma: &mut DmaController,
    device: &dyn PiDevice,
    dev_addr: u32,
    ram: &mut Ram,
    ram_addr: u32,
    chunk_size: usize,
    inflater: &mut dyn Inflater,
) -> DmaResult<usize> {
    let mut stream = DmaStream::new(dma, device, dev_addr, chunk_size);
    let output = inflater.inflate(&mut stream)?;

    debug!(
        "Dados comprimidos 0x{:08X} -> 0x{:08X}: {} bytes em {} recargas",
        dev_addr,
        ram_addr,
        output.len(),
        stream.refills()
    );

    ram.write(ram_addr, &output)?;
    Ok(output.len())
}
