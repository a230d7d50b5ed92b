//! Núcleo do gerenciador de overlays.
//!
//! Camadas, das folhas para o topo: memória (ROM, RDRAM, janelas), DMA,
//! tabelas de segmentos/overlays, carregador de fases e o laço do
//! gerenciador de cenas. A sessão (`session`) junta tudo.

pub mod config;
pub mod dma;
pub mod memory;
pub mod overlay;
pub mod scene;
pub mod session;
pub mod spawn;
pub mod stage;

#[cfg(test)]
pub(crate) mod fixtures;
