//! Mapa de janelas da RDRAM.
//! Cada janela pertence a no máximo um overlay/segmento por vez; carregar
//! algo numa janela sobreposta despeja o ocupante anterior.

use crate::core::overlay::{OverlayId, SegmentId};
use log::debug;
use std::fmt;

/// Intervalo VRAM `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub start: u32,
    pub end: u32,
}

impl Window {
    /// Cria uma janela; `None` se `end < start`
    pub fn new(start: u32, end: u32) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    /// Janela de `len` bytes a partir de `start`
    pub fn sized(start: u32, len: u32) -> Option<Self> {
        start.checked_add(len).map(|end| Self { start, end })
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr < self.end
    }

    pub fn overlaps(&self, other: &Window) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}..0x{:08X}", self.start, self.end)
    }
}

/// Ocupante de uma janela
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowOwner {
    Overlay(OverlayId),
    Segment(SegmentId),
}

impl fmt::Display for WindowOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowOwner::Overlay(id) => write!(f, "overlay {}", id),
            WindowOwner::Segment(id) => write!(f, "segment {}", id),
        }
    }
}

/// Tabela de ocupação das janelas
#[derive(Debug, Default)]
pub struct WindowMap {
    residents: Vec<(Window, WindowOwner)>,
}

impl WindowMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra `owner` em `window` e devolve os ocupantes despejados.
    /// Recarregar o mesmo ocupante não conta como despejo.
    pub fn claim(&mut self, window: Window, owner: WindowOwner) -> Vec<WindowOwner> {
        let mut evicted = Vec::new();

        self.residents.retain(|(resident, current)| {
            if *current == owner {
                return false;
            }
            if resident.overlaps(&window) {
                debug!("{} despejado de {} por {}", current, resident, owner);
                evicted.push(*current);
                return false;
            }
            true
        });

        if !window.is_empty() {
            self.residents.push((window, owner));
        }

        evicted
    }

    /// Libera tudo que sobrepõe `window` e devolve os ocupantes removidos.
    /// A janela fica sem dono até o próximo `claim`.
    pub fn release(&mut self, window: Window) -> Vec<WindowOwner> {
        let mut released = Vec::new();

        self.residents.retain(|(resident, current)| {
            if resident.overlaps(&window) {
                debug!("{} liberado de {}", current, resident);
                released.push(*current);
                return false;
            }
            true
        });

        released
    }

    /// Ocupante do endereço, se houver
    pub fn owner_at(&self, addr: u32) -> Option<WindowOwner> {
        self.residents
            .iter()
            .find(|(window, _)| window.contains(addr))
            .map(|(_, owner)| *owner)
    }

    pub fn is_resident(&self, owner: WindowOwner) -> bool {
        self.residents.iter().any(|(_, current)| *current == owner)
    }

    /// Janela ocupada por `owner`
    pub fn window_of(&self, owner: WindowOwner) -> Option<Window> {
        self.residents
            .iter()
            .find(|(_, current)| *current == owner)
            .map(|(window, _)| *window)
    }

    pub fn residents(&self) -> impl Iterator<Item = &(Window, WindowOwner)> {
        self.residents.iter()
    }

    /// Libera todas as janelas
    pub fn clear(&mut self) {
        self.residents.clear();
    }
}
