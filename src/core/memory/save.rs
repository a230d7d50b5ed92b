//! Gerenciamento de Save RAM (bateria).
//! Dispositivo PI gravável, destino das transferências RAM -> dispositivo.

use crate::core::dma::PiDevice;
use crate::core::memory::{MemoryError, MemoryResult};
use log::{error, info};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Save RAM com suporte a persistência
pub struct SaveMemory {
    pub data: Vec<u8>,
    pub write_protect: bool,
    pub dirty: bool,
    pub file_path: Option<PathBuf>,
}

impl SaveMemory {
    /// Cria uma nova Save RAM zerada
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
            write_protect: false,
            dirty: false,
            file_path: None,
        }
    }

    /// Carrega Save RAM de um arquivo (o tamanho é mantido)
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> std::io::Result<()> {
        let mut file = File::open(&path)?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;

        let len = contents.len().min(self.data.len());
        self.data[..len].copy_from_slice(&contents[..len]);
        self.file_path = Some(path.as_ref().to_path_buf());
        self.dirty = false;
        info!("Save RAM carregada: {} bytes", len);
        Ok(())
    }

    /// Salva Save RAM em um arquivo
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> std::io::Result<()> {
        let path = path.as_ref();
        let mut file = File::create(path)?;
        file.write_all(&self.data)?;
        self.file_path = Some(path.to_path_buf());
        self.dirty = false;
        info!("Save RAM salva: {} bytes", self.data.len());
        Ok(())
    }

    /// Salva automaticamente se suja
    pub fn auto_save(&mut self) {
        if !self.dirty || self.write_protect {
            return;
        }
        if let Some(path) = self.file_path.clone() {
            if let Err(e) = self.save_to_file(&path) {
                error!("Falha ao salvar Save RAM: {}", e);
            }
        }
    }

    /// Habilita/desabilita proteção contra escrita
    pub fn set_write_protect(&mut self, protect: bool) {
        self.write_protect = protect;
    }

    fn range(&self, addr: u32, len: usize) -> MemoryResult<std::ops::Range<usize>> {
        let start = addr as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(start..end),
            _ => Err(MemoryError::DeviceOutOfBounds {
                addr,
                len,
                size: self.data.len(),
            }),
        }
    }
}

impl PiDevice for SaveMemory {
    fn name(&self) -> &str {
        "save RAM"
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn read(&self, addr: u32, buf: &mut [u8]) -> MemoryResult<()> {
        let range = self.range(addr, buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> MemoryResult<()> {
        if self.write_protect {
            return Err(MemoryError::ReadOnly { addr });
        }
        let range = self.range(addr, data.len())?;
        self.data[range].copy_from_slice(data);
        self.dirty = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_marks_dirty() {
        let mut save = SaveMemory::new(0x100);
        save.write(0x10, &[1, 2, 3]).unwrap();
        assert!(save.dirty);

        let mut buf = [0u8; 3];
        save.read(0x10, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn test_write_protect() {
        let mut save = SaveMemory::new(0x100);
        save.set_write_protect(true);
        assert!(matches!(save.write(0, &[1]), Err(MemoryError::ReadOnly { addr: 0 })));
        assert!(!save.dirty);
    }

    #[test]
    fn test_bounds() {
        let mut save = SaveMemory::new(0x10);
        assert!(save.write(0x0F, &[1, 2]).is_err());
        let mut buf = [0u8; 0x11];
        assert!(save.read(0, &mut buf).is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("snap_overlay_save_{}.sra", std::process::id()));

        let mut save = SaveMemory::new(0x20);
        save.write(0, b"SNAP").unwrap();
        save.save_to_file(&path).unwrap();
        assert!(!save.dirty);

        let mut restored = SaveMemory::new(0x20);
        restored.load_from_file(&path).unwrap();
        assert_eq!(&restored.data[..4], b"SNAP");
        assert_eq!(restored.file_path.as_deref(), Some(path.as_path()));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_auto_save() {
        let path = std::env::temp_dir().join(format!("snap_overlay_auto_{}.sra", std::process::id()));
        let _ = std::fs::remove_file(&path);

        // Sem caminho: nada a fazer, continua suja
        let mut save = SaveMemory::new(0x10);
        save.write(0, &[9]).unwrap();
        save.auto_save();
        assert!(save.dirty);

        // Protegida: não grava
        save.file_path = Some(path.clone());
        save.set_write_protect(true);
        save.auto_save();
        assert!(save.dirty);
        assert!(!path.exists());

        // Suja e com caminho: grava e limpa
        save.set_write_protect(false);
        save.auto_save();
        assert!(!save.dirty);
        assert_eq!(std::fs::read(&path).unwrap()[0], 9);

        // Limpa: não grava de novo
        std::fs::remove_file(&path).unwrap();
        save.auto_save();
        assert!(!path.exists());
    }
}
