use std::time::{Duration, Instant};

use crate::types::AdapterProfile;

/// Frame cap applied on software adapters when the user did not pick one.
pub const SOFTWARE_FPS_CAP: f32 = 15.0;

/// Resolves the frame cap for the chosen adapter. A cap of zero or less
/// means uncapped.
pub fn effective_fps(requested: Option<f32>, profile: &AdapterProfile) -> Option<f32> {
    match requested {
        Some(fps) if fps > 0.0 => Some(fps),
        Some(_) => None,
        None if profile.is_software() => Some(SOFTWARE_FPS_CAP),
        None => None,
    }
}

/// Decides when the next redraw should be requested.
///
/// Uncapped schedulers are always ready and leave pacing to presentation.
/// Capped schedulers space frames by `1 / fps` measured from the previous
/// rendered frame.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval: Option<Duration>,
    last_frame: Option<Instant>,
}

impl FrameScheduler {
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)));
        Self {
            interval,
            last_frame: None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.interval, self.last_frame) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_frame = Some(now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        Some(self.last_frame? + self.interval?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(device_type: wgpu::DeviceType) -> AdapterProfile {
        AdapterProfile {
            name: "test adapter".into(),
            backend: wgpu::Backend::Vulkan,
            device_type,
            max_texture_dimension: 8192,
        }
    }

    #[test]
    fn uncapped_scheduler_is_always_ready() {
        let mut scheduler = FrameScheduler::new(None);
        let now = Instant::now();
        assert!(scheduler.ready_for_frame(now));
        scheduler.mark_rendered(now);
        assert!(scheduler.ready_for_frame(now));
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn capped_scheduler_spaces_frames() {
        let mut scheduler = FrameScheduler::new(Some(10.0));
        let start = Instant::now();
        assert!(scheduler.ready_for_frame(start));
        scheduler.mark_rendered(start);
        assert!(!scheduler.ready_for_frame(start + Duration::from_millis(50)));
        assert!(scheduler.ready_for_frame(start + Duration::from_millis(100)));
        assert_eq!(
            scheduler.next_deadline(),
            Some(start + Duration::from_millis(100))
        );
    }

    #[test]
    fn zero_fps_means_uncapped() {
        assert_eq!(FrameScheduler::new(Some(0.0)).interval(), None);
        assert_eq!(
            effective_fps(Some(0.0), &profile(wgpu::DeviceType::Cpu)),
            None
        );
    }

    #[test]
    fn software_adapters_get_default_cap() {
        assert_eq!(
            effective_fps(None, &profile(wgpu::DeviceType::Cpu)),
            Some(SOFTWARE_FPS_CAP)
        );
        assert_eq!(
            effective_fps(None, &profile(wgpu::DeviceType::DiscreteGpu)),
            None
        );
        assert_eq!(
            effective_fps(Some(60.0), &profile(wgpu::DeviceType::Cpu)),
            Some(60.0)
        );
    }
}
