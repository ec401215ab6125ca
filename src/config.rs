use crate::boundary::{BoundaryFace, DomainRules, FloorMode, Inflow};
use crate::driver::RunMode;
use crate::error::{CaseError, Result};
use crate::export::{Camera, VisualizationModes};
use crate::global_variables::*;
use crate::resolution::{Precision, StorageScheme, VelocitySet};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq)]
pub struct CaseConfig {
    pub case_name: String,
    pub aspect_ratio: [Float; D],
    pub memory_budget_mb: usize,
    pub storage: StorageScheme,
    pub si_length: Float,
    pub si_velocity: Float,
    pub si_density: Float,
    pub si_viscosity: Float,
    pub lattice_velocity: Float,
    pub lattice_density: Float,
    pub lattice_length_ratio: Float,
    pub run_mode: RunMode,
    pub primary_mesh: Option<PathBuf>,
    pub secondary_mesh: Option<PathBuf>,
    pub mesh_rotation: [Float; D],
    /// Meshes are shifted along y by their minimum y plus this many reference lengths.
    pub mesh_offset_lengths: Float,
    pub floor_face: BoundaryFace,
    pub floor_mode: FloorMode,
    pub inflow_face: Option<BoundaryFace>,
    pub visualization_modes: VisualizationModes,
    pub camera: Camera,
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            case_name: String::from(CASE_NAME),
            aspect_ratio: ASPECT_RATIO,
            memory_budget_mb: MEMORY_BUDGET_MB,
            storage: StorageScheme::default(),
            si_length: SI_LENGTH,
            si_velocity: SI_VELOCITY,
            si_density: SI_DENSITY,
            si_viscosity: SI_VISCOSITY,
            lattice_velocity: LATTICE_VELOCITY,
            lattice_density: LATTICE_DENSITY,
            lattice_length_ratio: LATTICE_LENGTH_RATIO,
            run_mode: RunMode::Scripted {
                steps: STEPS,
                insertion_step: INSERTION_STEP,
            },
            primary_mesh: Some(PathBuf::from("stl/SimpleBucket.stl")),
            secondary_mesh: Some(PathBuf::from("stl/Wall.stl")),
            mesh_rotation: [180.0, 0.0, 180.0],
            mesh_offset_lengths: MESH_OFFSET_LENGTHS,
            floor_face: BoundaryFace::Bottom,
            floor_mode: FloorMode::Unchanged,
            inflow_face: Some(BoundaryFace::South),
            visualization_modes: VisualizationModes::FLAG_SURFACE
                | VisualizationModes::Q_CRITERION,
            camera: Camera::default(),
        }
    }
}

impl CaseConfig {
    pub fn from_parameters(parameters: &HashMap<String, String>) -> Result<Self> {
        let run_mode = match required(parameters, "run_mode")?.as_str() {
            "scripted" => RunMode::Scripted {
                steps: parse(parameters, "steps")?,
                insertion_step: parse(parameters, "insertion_step")?,
            },
            "offline" => RunMode::Offline {
                duration: positive(parameters, "duration")?,
                video_length: positive(parameters, "video_length")?,
            },
            mode => {
                return Err(CaseError::invalid(
                    "run_mode",
                    format!("{mode} is not one of scripted, offline"),
                ))
            }
        };
        let storage = StorageScheme {
            precision: Precision::parse(&required(parameters, "precision")?)?,
            velocity_set: VelocitySet::parse(&required(parameters, "velocity_set")?)?,
            alignment: parse(parameters, "alignment")?,
        };
        let camera_values: [Float; 4] = parse_array(parameters, "camera")?;
        let inflow_face = match required(parameters, "inflow_face")?.as_str() {
            "none" => None,
            face => Some(BoundaryFace::parse(face)?),
        };
        Ok(Self {
            case_name: required(parameters, "case_name")?,
            aspect_ratio: parse_array(parameters, "aspect_ratio")?,
            memory_budget_mb: parse(parameters, "memory_budget_mb")?,
            storage,
            si_length: positive(parameters, "si_length")?,
            si_velocity: positive(parameters, "si_velocity")?,
            si_density: positive(parameters, "si_density")?,
            si_viscosity: positive(parameters, "si_viscosity")?,
            lattice_velocity: positive(parameters, "lattice_velocity")?,
            lattice_density: positive(parameters, "lattice_density")?,
            lattice_length_ratio: positive(parameters, "lattice_length_ratio")?,
            run_mode,
            primary_mesh: optional_path(parameters, "primary_mesh"),
            secondary_mesh: optional_path(parameters, "secondary_mesh"),
            mesh_rotation: parse_array(parameters, "mesh_rotation")?,
            mesh_offset_lengths: parse(parameters, "mesh_offset_lengths")?,
            floor_face: BoundaryFace::parse(&required(parameters, "floor_face")?)?,
            floor_mode: FloorMode::parse(&required(parameters, "floor")?)?,
            inflow_face,
            visualization_modes: VisualizationModes::parse(&required(
                parameters,
                "visualization_modes",
            )?)?,
            camera: Camera {
                rx: camera_values[0],
                ry: camera_values[1],
                fov: camera_values[2],
                zoom: camera_values[3],
            },
        })
    }

    pub fn domain_rules(&self) -> DomainRules {
        DomainRules {
            floor: self.floor_face,
            floor_mode: self.floor_mode,
            inflow: self.inflow_face.map(|face| Inflow {
                face,
                speed: self.lattice_velocity,
            }),
        }
    }

    pub fn default_case_setup() -> String {
        String::from(
            r#"# Bucket in an open box with inflow through the south face.
case_name                        = Bucket Inflow

aspect_ratio                     = 0.2 1.0 0.2
memory_budget_mb                 = 1000
precision                        = fp16s
velocity_set                     = d3q19
alignment                        = 1

si_length                        = 8.2
si_velocity                      = 1.0
si_density                       = 1.225
si_viscosity                     = 1.48e-5

lattice_velocity                 = 0.05
lattice_density                  = 1.0
lattice_length_ratio             = 0.2

# scripted: fixed step count, secondary mesh inserted at insertion_step
# offline: duration in seconds, one frame export cadence from video_length
run_mode                         = scripted
steps                            = 10000
insertion_step                   = 1000
duration                         = 30.0
video_length                     = 10.0

primary_mesh                     = stl/SimpleBucket.stl
secondary_mesh                   = stl/Wall.stl
mesh_rotation                    = 180.0 0.0 180.0
mesh_offset_lengths              = -4.2

# floor: unchanged, solid or open
floor_face                       = bottom
floor                            = unchanged
inflow_face                      = south

visualization_modes              = flag_surface|q_criterion
camera                           = -40.0 20.0 78.0 1.25
"#,
        )
    }
}

fn required(parameters: &HashMap<String, String>, key: &str) -> Result<String> {
    parameters
        .get(key)
        .cloned()
        .ok_or_else(|| CaseError::MissingParameter(key.to_string()))
}

fn parse<T>(parameters: &HashMap<String, String>, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = required(parameters, key)?;
    value
        .parse::<T>()
        .map_err(|e| CaseError::invalid(key, format!("{value}: {e}")))
}

fn positive(parameters: &HashMap<String, String>, key: &str) -> Result<Float> {
    let value: Float = parse(parameters, key)?;
    if !value.is_finite() || value <= 0.0 {
        return Err(CaseError::invalid(key, format!("must be positive, got {value}")));
    }
    Ok(value)
}

fn parse_array<const N: usize>(parameters: &HashMap<String, String>, key: &str) -> Result<[Float; N]> {
    let value = required(parameters, key)?;
    let values = value
        .split_whitespace()
        .map(|x| x.parse::<Float>())
        .collect::<std::result::Result<Vec<Float>, _>>()
        .map_err(|e| CaseError::invalid(key, format!("{value}: {e}")))?;
    values
        .try_into()
        .map_err(|values: Vec<Float>| {
            CaseError::invalid(key, format!("expected {N} values, found {}", values.len()))
        })
}

fn optional_path(parameters: &HashMap<String, String>, key: &str) -> Option<PathBuf> {
    parameters
        .get(key)
        .filter(|value| !value.is_empty() && value.as_str() != "none")
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::extract_parameters;

    #[test]
    fn default_setup_file_matches_default_config() {
        let parameters = extract_parameters(&CaseConfig::default_case_setup());
        let config = CaseConfig::from_parameters(&parameters).unwrap();
        assert_eq!(config, CaseConfig::default());
    }

    #[test]
    fn offline_mode_is_parsed() {
        let mut parameters = extract_parameters(&CaseConfig::default_case_setup());
        parameters.insert("run_mode".to_string(), "offline".to_string());
        let config = CaseConfig::from_parameters(&parameters).unwrap();
        assert_eq!(
            config.run_mode,
            RunMode::Offline {
                duration: DURATION,
                video_length: VIDEO_LENGTH
            }
        );
    }

    #[test]
    fn missing_key_is_reported() {
        let mut parameters = extract_parameters(&CaseConfig::default_case_setup());
        parameters.remove("si_length");
        let error = CaseConfig::from_parameters(&parameters).unwrap_err();
        assert!(matches!(error, CaseError::MissingParameter(key) if key == "si_length"));
    }

    #[test]
    fn non_positive_reference_is_rejected() {
        let mut parameters = extract_parameters(&CaseConfig::default_case_setup());
        parameters.insert("si_velocity".to_string(), "0".to_string());
        assert!(matches!(
            CaseConfig::from_parameters(&parameters),
            Err(CaseError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn wrong_vector_length_is_rejected() {
        let mut parameters = extract_parameters(&CaseConfig::default_case_setup());
        parameters.insert("aspect_ratio".to_string(), "1.0 2.0".to_string());
        let error = CaseConfig::from_parameters(&parameters).unwrap_err();
        assert!(error.to_string().contains("expected 3 values"));
    }

    #[test]
    fn meshes_and_inflow_can_be_disabled() {
        let mut parameters = extract_parameters(&CaseConfig::default_case_setup());
        parameters.insert("secondary_mesh".to_string(), "none".to_string());
        parameters.insert("inflow_face".to_string(), "none".to_string());
        let config = CaseConfig::from_parameters(&parameters).unwrap();
        assert!(config.secondary_mesh.is_none());
        assert!(config.domain_rules().inflow.is_none());
    }
}
