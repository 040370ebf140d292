use std::path::PathBuf;
use std::time::Duration;

/// Fixed-path cover image, relative to the working directory.
const IMAGE_PATH: &str = "covers/1.png";
const WINDOW_TITLE: &str = "Animated cover slider";
/// 1000 / 60 in integer milliseconds, i.e. ~60 Hz.
const TICK_INTERVAL_MS: u64 = 1000 / 60;

/// Step and ceiling for one animated scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    /// Added to the scalar on every tick.
    pub step: f32,
    /// The ramp stops on the first tick that lands above this.
    pub ceiling: f32,
}

/// Perspective parameters for the drawing area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionConfig {
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Distance the modelview pushes the scene away from the eye.
    pub eye_distance: f32,
}

/// Single diffuse light, modulated with the cover texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    /// Light diffuse colour times material diffuse.
    pub diffuse: [f32; 4],
    /// Scene ambient times material ambient.
    pub ambient: [f32; 4],
}

/// Every constant the slider runs with. There is no config file and no
/// command line; the app owns one `SliderConfig::default()`.
#[derive(Debug, Clone, PartialEq)]
pub struct SliderConfig {
    pub image_path: PathBuf,
    pub window_title: String,
    pub tick_interval: Duration,
    pub rotation: Ramp,
    pub translation: Ramp,
    pub projection: ProjectionConfig,
    pub lighting: Lighting,
    /// Logical height reserved for the title label above the drawing area.
    pub title_height: f64,
    /// Logical height reserved for the two button rows below it.
    pub controls_height: f64,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            image_path: PathBuf::from(IMAGE_PATH),
            window_title: WINDOW_TITLE.to_string(),
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
            rotation: Ramp {
                step: 10.0,
                ceiling: 45.0,
            },
            translation: Ramp {
                step: 0.05,
                ceiling: 0.5,
            },
            projection: ProjectionConfig {
                fov_y: 60.0,
                near: 1.0,
                far: 30.0,
                eye_distance: 2.0,
            },
            // Fixed-function defaults: white light, material diffuse 0.8,
            // scene ambient 0.2 against material ambient 0.2.
            lighting: Lighting {
                diffuse: [0.8, 0.8, 0.8, 1.0],
                ambient: [0.04, 0.04, 0.04, 1.0],
            },
            title_height: 40.0,
            controls_height: 64.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_at_sixty_hertz() {
        let cfg = SliderConfig::default();
        assert_eq!(cfg.tick_interval, Duration::from_millis(16));
    }

    #[test]
    fn default_ramps() {
        let cfg = SliderConfig::default();
        assert_eq!(cfg.rotation.step, 10.0);
        assert_eq!(cfg.rotation.ceiling, 45.0);
        assert_eq!(cfg.translation.step, 0.05);
        assert_eq!(cfg.translation.ceiling, 0.5);
    }
}
