use std::ops::RangeInclusive;
use std::sync::Arc;

use parking_lot::Mutex;

/// Mass used when none has been chosen yet.
pub const DEFAULT_MASS: f32 = 50.0;

/// Range offered by the interactive controls.
pub const MASS_RANGE: RangeInclusive<f32> = 1.0..=200.0;

/// Smallest mass ever fed to the lens.
///
/// Anything at or below zero is replaced with this value. Masses in `(0, 1)`
/// are passed through untouched; they shrink the horizon below a pixel rather
/// than disabling the effect.
pub const MIN_MASS: f32 = 1e-3;

/// Replaces non-positive or non-finite masses with [`MIN_MASS`].
pub fn guard_mass(mass: f32) -> f32 {
    if mass.is_finite() && mass > 0.0 {
        mass
    } else {
        MIN_MASS
    }
}

/// User-facing knobs read once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParameters {
    pub mass: f32,
    pub show_disk: bool,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            mass: DEFAULT_MASS,
            show_disk: true,
        }
    }
}

impl SimulationParameters {
    pub fn new(mass: f32, show_disk: bool) -> Self {
        Self { mass, show_disk }
    }

    /// Mass as seen by the lens, see [`guard_mass`].
    pub fn effective_mass(&self) -> f32 {
        guard_mass(self.mass)
    }

    /// Returns a copy with `mass` nudged by `delta` and clamped to [`MASS_RANGE`].
    pub fn with_mass_step(self, delta: f32) -> Self {
        let mass = (self.mass + delta).clamp(*MASS_RANGE.start(), *MASS_RANGE.end());
        Self { mass, ..self }
    }

    pub fn with_disk_toggled(self) -> Self {
        Self {
            show_disk: !self.show_disk,
            ..self
        }
    }
}

/// Cross-thread cell holding the latest parameters.
///
/// Writers replace the whole value and the frame loop copies it out under the
/// same lock, so a reader never observes half of an update.
#[derive(Debug, Clone, Default)]
pub struct SharedParameters {
    inner: Arc<Mutex<SimulationParameters>>,
}

impl SharedParameters {
    pub fn new(initial: SimulationParameters) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    /// Copies the current value out.
    pub fn load(&self) -> SimulationParameters {
        *self.inner.lock()
    }

    pub fn store(&self, value: SimulationParameters) {
        *self.inner.lock() = value;
    }

    /// Applies `f` to the current value and stores the result, returning it.
    pub fn update(&self, f: impl FnOnce(SimulationParameters) -> SimulationParameters) -> SimulationParameters {
        let mut guard = self.inner.lock();
        *guard = f(*guard);
        *guard
    }
}

/// Drawable size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero-area viewport cannot back a render target.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}
