// snap-overlay-rs/src/core/scene/mod.rs

//! Scene manager loop
//!
//! Every iteration reloads the two manager overlays and runs one scene
//! step. The loop stops for good when a step fails, when a reload faults,
//! or when the iteration counter reaches the limit. A halted manager never
//! does further work.

use crate::core::config::OverlayConfig;
use crate::core::memory::MemoryBus;
use crate::core::overlay::{OverlayId, OverlayRegistry};
use log::{debug, error, info};
use std::fmt;

/// Result of one scene step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Continue,
    /// Non-zero status code reported by the scene
    Failed(i32),
}

impl From<i32> for StepStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => StepStatus::Continue,
            code => StepStatus::Failed(code),
        }
    }
}

/// Scene logic driven by the manager
pub trait SceneStep {
    fn step_scene(&mut self, counter: u32) -> StepStatus;
}

impl<F> SceneStep for F
where
    F: FnMut(u32) -> StepStatus,
{
    fn step_scene(&mut self, counter: u32) -> StepStatus {
        self(counter)
    }
}

/// Why the manager halted on error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltCause {
    StepFailed(i32),
    OverlayFault(String),
}

impl fmt::Display for HaltCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltCause::StepFailed(code) => write!(f, "scene step returned {}", code),
            HaltCause::OverlayFault(reason) => write!(f, "overlay reload failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneState {
    Running(u32),
    HaltedError { counter: u32, cause: HaltCause },
    HaltedLimit { counter: u32 },
}

impl SceneState {
    pub fn is_halted(&self) -> bool {
        !matches!(self, SceneState::Running(_))
    }

    pub fn counter(&self) -> u32 {
        match *self {
            SceneState::Running(counter)
            | SceneState::HaltedError { counter, .. }
            | SceneState::HaltedLimit { counter } => counter,
        }
    }
}

pub struct SceneManager {
    state: SceneState,
    limit: u32,
    managers: [OverlayId; 2],
    reloads: u64,
}

impl SceneManager {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            state: SceneState::Running(0),
            limit: config.scene_iteration_limit,
            managers: config.scene_managers,
            reloads: 0,
        }
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state.is_halted()
    }

    /// Manager overlay loads performed so far
    pub fn reloads(&self) -> u64 {
        self.reloads
    }

    /// Runs one iteration; no-op once halted
    pub fn step(
        &mut self,
        registry: &mut OverlayRegistry,
        bus: &mut MemoryBus,
        scene: &mut dyn SceneStep,
    ) -> &SceneState {
        let counter = match self.state {
            SceneState::Running(counter) => counter,
            _ => return &self.state,
        };

        if counter >= self.limit {
            self.halt(SceneState::HaltedLimit { counter });
            return &self.state;
        }

        for id in self.managers {
            if let Err(e) = registry.load_overlay(id, bus) {
                self.halt(SceneState::HaltedError {
                    counter,
                    cause: HaltCause::OverlayFault(e.to_string()),
                });
                return &self.state;
            }
            self.reloads += 1;
        }

        match scene.step_scene(counter) {
            StepStatus::Continue => {
                let next = counter + 1;
                debug!("Scene iteration {} done", counter);
                if next >= self.limit {
                    self.halt(SceneState::HaltedLimit { counter: next });
                } else {
                    self.state = SceneState::Running(next);
                }
            }
            StepStatus::Failed(code) => {
                self.halt(SceneState::HaltedError {
                    counter,
                    cause: HaltCause::StepFailed(code),
                });
            }
        }
        &self.state
    }

    /// Drives the loop until it halts and returns the terminal state
    pub fn run(
        &mut self,
        registry: &mut OverlayRegistry,
        bus: &mut MemoryBus,
        scene: &mut dyn SceneStep,
    ) -> SceneState {
        while !self.is_halted() {
            self.step(registry, bus, scene);
        }
        self.state.clone()
    }

    fn halt(&mut self, state: SceneState) {
        match &state {
            SceneState::HaltedLimit { counter } => {
                info!("Scene manager reached iteration limit at {}", counter)
            }
            SceneState::HaltedError { counter, cause } => {
                error!("Scene manager halted at iteration {}: {}", counter, cause)
            }
            SceneState::Running(_) => {}
        }
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures;
    use crate::core::memory::Ram;
    use crate::core::overlay::{Overlay, Relocator};

    fn setup() -> (OverlayRegistry, MemoryBus) {
        let layout = fixtures::layout();
        let bus = fixtures::bus(&layout);
        (OverlayRegistry::new(layout.overlays.clone()), bus)
    }

    #[test]
    fn test_runs_to_limit() {
        let (mut registry, mut bus) = setup();
        let mut manager = SceneManager::new(&OverlayConfig::default());
        let mut seen = Vec::new();

        let state = manager.run(&mut registry, &mut bus, &mut |counter: u32| {
            seen.push(counter);
            StepStatus::Continue
        });

        assert_eq!(state, SceneState::HaltedLimit { counter: 0x11 });
        assert_eq!(seen, (0..17).collect::<Vec<_>>());
        assert_eq!(manager.reloads(), 34);
        assert_eq!(registry.load_count(), 34);
    }

    #[test]
    fn test_failure_halts_at_counter() {
        for k in [0u32, 5, 16] {
            let (mut registry, mut bus) = setup();
            let mut manager = SceneManager::new(&OverlayConfig::default());
            let mut calls = 0;

            let state = manager.run(&mut registry, &mut bus, &mut |counter: u32| {
                calls += 1;
                if counter == k {
                    StepStatus::Failed(-1)
                } else {
                    StepStatus::Continue
                }
            });

            assert_eq!(
                state,
                SceneState::HaltedError {
                    counter: k,
                    cause: HaltCause::StepFailed(-1)
                }
            );
            assert_eq!(calls, k + 1);
            assert_eq!(manager.reloads(), 2 * (k as u64 + 1));
        }
    }

    #[test]
    fn test_halted_manager_does_no_work() {
        let (mut registry, mut bus) = setup();
        let mut manager = SceneManager::new(&OverlayConfig::default());
        manager.run(&mut registry, &mut bus, &mut |_: u32| StepStatus::from(2));

        let loads = registry.load_count();
        let mut called = false;
        let state = manager
            .step(&mut registry, &mut bus, &mut |_: u32| {
                called = true;
                StepStatus::Continue
            })
            .clone();

        assert!(!called);
        assert_eq!(registry.load_count(), loads);
        assert_eq!(state.counter(), 0);
        assert!(matches!(state, SceneState::HaltedError { cause: HaltCause::StepFailed(2), .. }));
    }

    #[test]
    fn test_managers_reloaded_in_order() {
        let (mut registry, mut bus) = setup();
        let mut manager = SceneManager::new(&OverlayConfig::default());

        manager.step(&mut registry, &mut bus, &mut |_: u32| StepStatus::Continue);
        assert_eq!(registry.last_bound(), Some(OverlayId::ManagerB));
        assert!(registry.entry_point(OverlayId::ManagerA, &bus).is_some());
        assert_eq!(manager.state(), &SceneState::Running(1));
    }

    struct RejectManagerB;

    impl Relocator for RejectManagerB {
        fn relocate(&mut self, overlay: &Overlay, _ram: &mut Ram) -> Result<(), String> {
            if overlay.id == OverlayId::ManagerB {
                Err("corrupt".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_overlay_fault_is_fail_stop() {
        let (mut registry, mut bus) = setup();
        registry.set_relocator(Box::new(RejectManagerB));
        let mut manager = SceneManager::new(&OverlayConfig::default());
        let mut called = false;

        let state = manager.run(&mut registry, &mut bus, &mut |_: u32| {
            called = true;
            StepStatus::Continue
        });

        assert!(!called);
        assert_eq!(manager.reloads(), 1);
        assert!(matches!(
            state,
            SceneState::HaltedError { counter: 0, cause: HaltCause::OverlayFault(_) }
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(StepStatus::from(0), StepStatus::Continue);
        assert_eq!(StepStatus::from(-3), StepStatus::Failed(-3));
    }
}
