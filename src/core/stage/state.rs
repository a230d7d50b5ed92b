//! Estado da fase ativa.
//! Dois campos independentes, lidos e escritos sem validação.

/// Modo e flag da fase atual
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ActiveStageState {
    mode: i32,
    flag: i32,
}

impl ActiveStageState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stage_mode(&mut self, mode: i32) {
        self.mode = mode;
    }

    pub fn get_stage_mode(&self) -> i32 {
        self.mode
    }

    pub fn set_stage_flag(&mut self, flag: i32) {
        self.flag = flag;
    }

    pub fn get_stage_flag(&self) -> i32 {
        self.flag
    }
}
