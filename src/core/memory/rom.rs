//! Imagem da ROM do cartucho.
//! Carrega a ROM de arquivo ou buffer e normaliza a ordem de bytes
//! para big-endian (formato z64).

use crate::core::dma::PiDevice;
use crate::core::memory::{MemoryError, MemoryResult, ROM_HEADER_SIZE};
use log::{debug, info, warn};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Primeira palavra de uma ROM big-endian (.z64)
pub const Z64_MAGIC: [u8; 4] = [0x80, 0x37, 0x12, 0x40];
/// Primeira palavra de uma ROM com bytes trocados aos pares (.v64)
pub const V64_MAGIC: [u8; 4] = [0x37, 0x80, 0x40, 0x12];
/// Primeira palavra de uma ROM little-endian (.n64)
pub const N64_MAGIC: [u8; 4] = [0x40, 0x12, 0x37, 0x80];

/// Posição do nome interno no cabeçalho
const NAME_RANGE: std::ops::Range<usize> = 0x20..0x34;

/// Ordem de bytes detectada no arquivo original
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    BigEndian,    // .z64 (nativo)
    ByteSwapped,  // .v64
    LittleEndian, // .n64
}

impl ByteOrder {
    /// Detecta a ordem de bytes pela primeira palavra da imagem
    pub fn detect(first_word: &[u8]) -> Option<Self> {
        if first_word == &Z64_MAGIC[..] {
            Some(ByteOrder::BigEndian)
        } else if first_word == &V64_MAGIC[..] {
            Some(ByteOrder::ByteSwapped)
        } else if first_word == &N64_MAGIC[..] {
            Some(ByteOrder::LittleEndian)
        } else {
            None
        }
    }

    /// Converte a imagem para big-endian no lugar
    fn normalize(self, data: &mut [u8]) {
        match self {
            ByteOrder::BigEndian => {}
            ByteOrder::ByteSwapped => {
                for pair in data.chunks_exact_mut(2) {
                    pair.swap(0, 1);
                }
            }
            ByteOrder::LittleEndian => {
                for word in data.chunks_exact_mut(4) {
                    word.reverse();
                }
            }
        }
    }
}

/// ROM do cartucho (sempre armazenada em big-endian)
#[derive(Debug, Clone)]
pub struct Rom {
    data: Vec<u8>,
    byte_order: ByteOrder,
    name: String,
}

impl Rom {
    /// Cria uma ROM a partir de uma imagem big-endian já pronta,
    /// sem validar o cabeçalho.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let name = header_name(&data);
        Self {
            data,
            byte_order: ByteOrder::BigEndian,
            name,
        }
    }

    /// Carrega uma ROM do arquivo
    pub fn load_from_file<P: AsRef<Path>>(path: P, max_size: usize) -> MemoryResult<Self> {
        let mut file = File::open(path.as_ref())?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;

        debug!("ROM lida de {}: {} bytes", path.as_ref().display(), buffer.len());
        Self::load_from_buffer(&buffer, max_size)
    }

    /// Carrega uma ROM de um buffer, detectando a ordem de bytes
    pub fn load_from_buffer(buffer: &[u8], max_size: usize) -> MemoryResult<Self> {
        if buffer.len() > max_size {
            return Err(MemoryError::RomTooLarge {
                size: buffer.len(),
                max: max_size,
            });
        }
        if buffer.len() < ROM_HEADER_SIZE {
            return Err(MemoryError::RomTooSmall { size: buffer.len() });
        }

        let mut data = buffer.to_vec();
        let byte_order = match ByteOrder::detect(&data[..4]) {
            Some(order) => order,
            None => {
                warn!(
                    "Assinatura de ROM desconhecida {:02X?}, assumindo big-endian",
                    &data[..4]
                );
                ByteOrder::BigEndian
            }
        };
        byte_order.normalize(&mut data);

        let name = header_name(&data);
        info!(
            "ROM carregada: \"{}\", {} bytes, ordem {:?}",
            name,
            data.len(),
            byte_order
        );

        Ok(Self {
            data,
            byte_order,
            name,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Ordem de bytes do arquivo de origem
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Nome interno do cabeçalho
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Imagem completa (big-endian)
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Fatia da ROM com verificação de limites
    pub fn slice(&self, addr: u32, len: usize) -> MemoryResult<&[u8]> {
        let start = addr as usize;
        start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
            .ok_or(MemoryError::DeviceOutOfBounds {
                addr,
                len,
                size: self.data.len(),
            })
    }
}

impl PiDevice for Rom {
    fn name(&self) -> &str {
        "cartridge ROM"
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn read(&self, addr: u32, buf: &mut [u8]) -> MemoryResult<()> {
        buf.copy_from_slice(self.slice(addr, buf.len())?);
        Ok(())
    }

    fn write(&mut self, addr: u32, _data: &[u8]) -> MemoryResult<()> {
        Err(MemoryError::ReadOnly { addr })
    }
}

/// Extrai o nome interno (0x20..0x34), sem espaços e NULs finais
fn header_name(data: &[u8]) -> String {
    data.get(NAME_RANGE)
        .map(|raw| {
            String::from_utf8_lossy(raw)
                .trim_end_matches(|c: char| c == '\0' || c == ' ')
                .to_string()
        })
        .unwrap_or_default()
}
