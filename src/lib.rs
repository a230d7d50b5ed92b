// Este é o ponto de entrada principal da biblioteca.
// Gerenciador de overlays: segmentos de ROM, overlays de código, carregamento
// de fases (stages) e o laço do gerenciador de cenas.

// Módulos principais do projeto.
pub mod core;

// Re-exportações para facilitar o uso.
pub use crate::core::config::OverlayConfig;
pub use crate::core::overlay::{OverlayId, SegmentId};
pub use crate::core::scene::{SceneState, StepStatus};
pub use crate::core::session::{GameSession, SharedSession};
pub use crate::core::stage::StageId;

/// Versão da biblioteca.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
