use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    // The resolution of the simulation grid along its smaller axis. The dye
    // field is kept separate so the visible colors can be much sharper than
    // the velocity field that moves them.
    pub sim_resolution: u32,
    pub dye_resolution: u32,

    pub density_dissipation: f32,
    pub velocity_dissipation: f32,

    // The factor by which the previous frame's pressure field is scaled
    // before seeding the next Jacobi solve.
    pub pressure: f32,
    pub pressure_iterations: u32,

    pub curl: f32,

    pub splat_radius: f32,
    pub splat_force: f32,

    pub shading: bool,
    pub back_color: [f32; 3],
    pub transparent: bool,

    // How quickly pointers are assigned fresh colors, in wraps per second.
    pub color_update_speed: f32,

    pub seed: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sim_resolution: 128,
            dye_resolution: 1440,
            density_dissipation: 3.5,
            velocity_dissipation: 2.0,
            pressure: 0.1,
            pressure_iterations: 20,
            curl: 3.0,
            splat_radius: 0.2,
            splat_force: 6000.0,
            shading: true,
            back_color: [0.5, 0.0, 0.0],
            transparent: true,
            color_update_speed: 10.0,
            seed: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum InvalidSettings {
    #[error("the simulation resolution must be greater than zero")]
    ZeroSimResolution,

    #[error("the dye resolution must be greater than zero")]
    ZeroDyeResolution,

    #[error("the pressure solver needs at least one iteration")]
    NoPressureIterations,
}

impl Settings {
    pub fn validate(&self) -> Result<(), InvalidSettings> {
        if self.sim_resolution == 0 {
            return Err(InvalidSettings::ZeroSimResolution);
        }

        if self.dye_resolution == 0 {
            return Err(InvalidSettings::ZeroDyeResolution);
        }

        if self.pressure_iterations == 0 {
            return Err(InvalidSettings::NoPressureIterations);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.sim_resolution, 128);
        assert_eq!(settings.dye_resolution, 1440);
        assert_eq!(settings.pressure_iterations, 20);
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let settings = Settings {
            sim_resolution: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(InvalidSettings::ZeroSimResolution)
        ));

        let settings = Settings {
            dye_resolution: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(InvalidSettings::ZeroDyeResolution)
        ));
    }

    #[test]
    fn pressure_solver_needs_an_iteration() {
        let settings = Settings {
            pressure_iterations: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(InvalidSettings::NoPressureIterations)
        ));
    }

    #[test]
    fn settings_files_use_camel_case_keys() {
        let settings: Settings = serde_json::from_str(
            r#"{ "simResolution": 64, "pressureIterations": 8, "shading": false }"#,
        )
        .unwrap();
        assert_eq!(settings.sim_resolution, 64);
        assert_eq!(settings.pressure_iterations, 8);
        assert!(!settings.shading);

        // Everything else falls back to the defaults.
        assert_eq!(settings.dye_resolution, 1440);
    }
}
