//! Mechanism for loading and sharing the analysis configuration

use crate::{
    calib::Calibration,
    evcut::{ArmCut, CoincidenceCut, TimeWindow},
    field::{Beamline, FieldError, FieldSegment},
    numeric::Float,
    units::{in_gauss, in_millimeter, in_volt, Quantity, Unit},
    Result,
};

use eyre::{ensure, WrapErr};
use log::info;
use thiserror::Error;

use std::{collections::BTreeMap, error::Error as StdError, fs, str::FromStr};

/// Errors which can occur while decoding the configuration table
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A line does not hold exactly one name and one value
    #[error("line {line} should be of the form `name value`, got `{content}`")]
    Malformed { line: usize, content: String },

    /// A configuration item was specified twice
    #[error("configuration of {0} is specified twice")]
    Duplicate(String),

    /// A configuration item was not specified
    #[error("missing configuration of {0}")]
    Missing(&'static str),

    /// A configuration item is not known
    #[error("unknown configuration item {0}")]
    Unknown(String),

    /// A configuration value could not be parsed
    #[error("could not parse configuration of {name} from `{data}`")]
    Invalid {
        name: &'static str,
        data: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// Geometry (mm) and electric potentials (V) of the spectrometer
///
/// ```text
///   ion2nd                 ion1st       electron
/// ┌───┐│                      │             │                    │┌───┐
/// │ion││        acc_reg       │ sep regions │     draft_reg      ││ele│
/// │mcp││                      │────x────────│                    ││mcp│
/// └───┘│                      │             │                    │└───┘
/// ```
///
/// The reaction point `x` splits the separation region into an ion side
/// (`ionsep_reg`) and an electron side (`elesep_reg`).
///
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectrometerSettings {
    pub draft_reg: Float,
    pub elesep_reg: Float,
    pub ionsep_reg: Float,
    pub acc_reg: Float,
    pub mcpgep_reg: Float,
    pub electron_epoten: Float,
    pub ion1st_epoten: Float,
    pub ion2nd_epoten: Float,
    pub ionmcp_epoten: Float,

    /// Uniform magnetic field along the spectrometer axis (G)
    pub uniform_mfield: Float,
}
//
impl SpectrometerSettings {
    /// Field regions crossed by ions, in traversal order
    pub fn ion_beamline(&self) -> std::result::Result<Beamline, FieldError> {
        let sep = in_millimeter(self.ionsep_reg + self.elesep_reg);
        Ok(Beamline::from(uniform(self.ionsep_reg, in_volt(self.electron_epoten - self.ion1st_epoten) / sep)?)
            .then(uniform(
                self.acc_reg,
                in_volt(self.ion1st_epoten - self.ion2nd_epoten) / in_millimeter(self.acc_reg),
            )?)
            .then(uniform(
                self.mcpgep_reg,
                in_volt(self.ion2nd_epoten - self.ionmcp_epoten) / in_millimeter(self.mcpgep_reg),
            )?))
    }

    /// Field regions crossed by electrons, in traversal order
    pub fn electron_beamline(&self) -> std::result::Result<Beamline, FieldError> {
        let sep = in_millimeter(self.ionsep_reg + self.elesep_reg);
        Ok(Beamline::from(uniform(self.elesep_reg, in_volt(self.ion1st_epoten - self.electron_epoten) / sep)?)
            .then(FieldSegment::none(in_millimeter(self.draft_reg))?))
    }

    /// Magnetic field, if any
    pub fn magnetic_field(&self) -> Option<Quantity> {
        (self.uniform_mfield != 0.).then(|| in_gauss(self.uniform_mfield))
    }
}

fn uniform(length_mm: Float, field: Quantity) -> std::result::Result<FieldSegment, FieldError> {
    FieldSegment::uniform_electric(in_millimeter(length_mm), field)
}

/// Analysis configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    /// Spectrometer geometry and fields
    pub spectrometer: SpectrometerSettings,

    /// Reference ion species (mass in amu, charge in elementary charges),
    /// only used to report the expected ion flight time
    pub ion_species: (Float, Float),

    /// Per-hit cuts of the ion arm
    pub ion_cut: ArmCut,

    /// Coincidence cut on ion hits
    pub coincidence: CoincidenceCut,

    /// Per-hit cuts of the electron arm
    pub electron_cut: ArmCut,

    /// Electron flight times for which momentum is reconstructed (ns), bounds
    /// excluded
    pub good_signal: TimeWindow,
}
//
impl Configuration {
    /// Load the configuration from a file and check it
    pub fn load(file_name: &str) -> Result<Self> {
        let config_str =
            fs::read_to_string(file_name).wrap_err_with(|| format!("Could not read {file_name}"))?;
        Self::parse(&config_str)
    }

    /// Decode a configuration table and check it
    ///
    /// Each non-blank line holds a name and a value separated by whitespace.
    /// Everything after a `#` is a comment. Every item must be specified
    /// exactly once.
    ///
    pub fn parse(config_str: &str) -> Result<Self> {
        let mut table = ConfigTable::new(config_str)?;

        let spectrometer = SpectrometerSettings {
            draft_reg: table.take("draft_reg")?.parse()?,
            elesep_reg: table.take("elesep_reg")?.parse()?,
            ionsep_reg: table.take("ionsep_reg")?.parse()?,
            acc_reg: table.take("acc_reg")?.parse()?,
            mcpgep_reg: table.take("mcpgep_reg")?.parse()?,
            electron_epoten: table.take("electron_epoten")?.parse()?,
            ion1st_epoten: table.take("ion1st_epoten")?.parse()?,
            ion2nd_epoten: table.take("ion2nd_epoten")?.parse()?,
            ionmcp_epoten: table.take("ionmcp_epoten")?.parse()?,
            uniform_mfield: table.take("uniform_mfield")?.parse()?,
        };
        let ion_species = (table.take("ion_ref_mass")?.parse()?, table.take("ion_ref_charge")?.parse()?);
        let ion_cut = table.arm_cut(&ArmKeys::ION)?;
        let coincidence = CoincidenceCut {
            multiplicity: table.take("ion_coinc_hits")?.parse()?,
            window: table.window(["ion_coinc_t_min", "ion_coinc_t_max"])?,
        };
        let electron_cut = table.arm_cut(&ArmKeys::ELECTRON)?;
        let good_signal = table.window(["ele_good_t_min", "ele_good_t_max"])?;
        table.finish()?;

        let config = Configuration {
            spectrometer,
            ion_species,
            ion_cut,
            coincidence,
            electron_cut,
            good_signal,
        };
        config.check()?;
        Ok(config)
    }

    /// Check that the configuration makes sense
    fn check(&self) -> Result<()> {
        let s = &self.spectrometer;
        for (name, length) in [
            ("draft_reg", s.draft_reg),
            ("elesep_reg", s.elesep_reg),
            ("ionsep_reg", s.ionsep_reg),
            ("acc_reg", s.acc_reg),
            ("mcpgep_reg", s.mcpgep_reg),
        ] {
            ensure!(length > 0., "{name} must be a positive length, got {length} mm");
        }

        for (arm, cut) in [("ion", &self.ion_cut), ("electron", &self.electron_cut)] {
            let window = cut.live_window;
            ensure!(window.min < window.max, "The {arm} dead-time window [{}, {}) is empty", window.min, window.max);
            let calib = &cut.calibration;
            let (dx, dy) = calib.scale();
            ensure!(
                dx.is_finite() && dy.is_finite() && dx != 0. && dy != 0.,
                "The {arm} detector scale factors must be finite and non-zero"
            );
        }

        ensure!(self.coincidence.multiplicity > 0, "The ion coincidence cut needs at least one hit");
        let coinc = self.coincidence.window;
        ensure!(coinc.min < coinc.max, "The ion coincidence window is empty");

        let good = self.good_signal;
        let live = self.electron_cut.live_window;
        ensure!(
            live.min <= good.min && good.max <= live.max && good.min < good.max,
            "The electron good-signal window ({}, {}) must be a non-empty part of the dead-time window [{}, {})",
            good.min,
            good.max,
            live.min,
            live.max
        );

        ensure!(self.ion_species.0 > 0., "The reference ion mass must be positive");
        Ok(())
    }

    /// Log the configuration
    pub fn print(&self) {
        let s = &self.spectrometer;
        info!(
            "Regions (mm): draft {}, electron sep {}, ion sep {}, acceleration {}, MCP gap {}",
            s.draft_reg, s.elesep_reg, s.ionsep_reg, s.acc_reg, s.mcpgep_reg
        );
        info!(
            "Potentials (V): electron {}, ion 1st {}, ion 2nd {}, ion MCP {}",
            s.electron_epoten, s.ion1st_epoten, s.ion2nd_epoten, s.ionmcp_epoten
        );
        info!("Magnetic field (G): {}", s.uniform_mfield);
        for (arm, cut) in [("Ion", &self.ion_cut), ("Electron", &self.electron_cut)] {
            let calib = &cut.calibration;
            let (x0, y0) = calib.center();
            let (dx, dy) = calib.scale();
            info!(
                "{arm} arm: flag <= {}, t0 {} ns, angle {:.4} rad, centre ({x0}, {y0}) mm, scale ({dx}, {dy}), live [{}, {}) ns",
                cut.flag_max,
                calib.t0,
                calib.angle(),
                cut.live_window.min,
                cut.live_window.max
            );
        }
        info!(
            "Ion coincidence: first {} hits in ({}, {}) ns",
            self.coincidence.multiplicity, self.coincidence.window.min, self.coincidence.window.max
        );
        info!("Electron good signal: ({}, {}) ns", self.good_signal.min, self.good_signal.max);
    }
}

/// Table of named configuration values, consumed as they are decoded
struct ConfigTable<'data> {
    items: BTreeMap<&'data str, &'data str>,
}
//
impl<'data> ConfigTable<'data> {
    /// Split a configuration file into named items
    fn new(config_str: &'data str) -> std::result::Result<Self, ConfigError> {
        let mut items = BTreeMap::new();
        for (index, line) in config_str.lines().enumerate() {
            let content = line.split('#').next().unwrap_or_default();
            let mut words = content.split_whitespace();
            let (name, data) = match (words.next(), words.next(), words.next()) {
                (None, _, _) => continue,
                (Some(name), Some(data), None) => (name, data),
                _ => {
                    return Err(ConfigError::Malformed {
                        line: index + 1,
                        content: line.trim().to_owned(),
                    })
                }
            };
            if items.insert(name, data).is_some() {
                return Err(ConfigError::Duplicate(name.to_owned()));
            }
        }
        Ok(Self { items })
    }

    /// Fetch a configuration item, tagged with its name
    fn take(&mut self, name: &'static str) -> std::result::Result<ConfigItem<'data>, ConfigError> {
        self.items
            .remove(name)
            .map(|data| ConfigItem::new(name, data))
            .ok_or(ConfigError::Missing(name))
    }

    /// Fetch a time window (ns) from its bounds
    fn window(&mut self, [min, max]: [&'static str; 2]) -> std::result::Result<TimeWindow, ConfigError> {
        Ok(TimeWindow::new(self.take(min)?.parse()?, self.take(max)?.parse()?))
    }

    /// Fetch the per-hit cuts of a detector arm: flag threshold, calibration
    /// (t0 in ns, angle in degrees, centre in mm, scale factors), and dead
    /// time window (ns)
    fn arm_cut(&mut self, keys: &ArmKeys) -> std::result::Result<ArmCut, ConfigError> {
        let flag_max = self.take(keys.flag_max)?.parse()?;
        let t0 = self.take(keys.t0)?.parse()?;
        let angle = Unit::Degree.to_internal_value(self.take(keys.angle)?.parse()?);
        let x0 = self.take(keys.x0)?.parse()?;
        let y0 = self.take(keys.y0)?.parse()?;
        let dx = self.take(keys.dx)?.parse()?;
        let dy = self.take(keys.dy)?.parse()?;
        Ok(ArmCut {
            flag_max,
            calibration: Calibration::new(t0, angle, x0, y0, dx, dy),
            live_window: self.window([keys.t_min, keys.t_max])?,
        })
    }

    /// Check that every configuration item has been used
    fn finish(self) -> std::result::Result<(), ConfigError> {
        match self.items.into_keys().next() {
            Some(name) => Err(ConfigError::Unknown(name.to_owned())),
            None => Ok(()),
        }
    }
}

/// Names of the configuration items of one detector arm
struct ArmKeys {
    flag_max: &'static str,
    t0: &'static str,
    angle: &'static str,
    x0: &'static str,
    y0: &'static str,
    dx: &'static str,
    dy: &'static str,
    t_min: &'static str,
    t_max: &'static str,
}
//
impl ArmKeys {
    const ION: Self = Self {
        flag_max: "ion_flag_max",
        t0: "ion_t0",
        angle: "ion_th",
        x0: "ion_x0",
        y0: "ion_y0",
        dx: "ion_dx",
        dy: "ion_dy",
        t_min: "ion_t_min",
        t_max: "ion_t_max",
    };

    const ELECTRON: Self = Self {
        flag_max: "ele_flag_max",
        t0: "ele_t0",
        angle: "ele_th",
        x0: "ele_x0",
        y0: "ele_y0",
        dx: "ele_dx",
        dy: "ele_dy",
        t_min: "ele_t_min",
        t_max: "ele_t_max",
    };
}

/// A value from the configuration file, tagged with the name of the item
/// which it is supposed to fill for error reporting purposes.
struct ConfigItem<'data> {
    name: &'static str,
    data: &'data str,
}
//
impl<'data> ConfigItem<'data> {
    /// Build a config item from a name and raw data
    fn new(name: &'static str, data: &'data str) -> Self {
        Self { name, data }
    }

    /// Parse this data using Rust's standard parsing logic
    fn parse<T: FromStr>(self) -> std::result::Result<T, ConfigError>
    where
        <T as FromStr>::Err: StdError + Send + Sync + 'static,
    {
        self.data.parse::<T>().map_err(|e| ConfigError::Invalid {
            name: self.name,
            data: self.data.to_owned(),
            source: Box::new(e),
        })
    }
}
