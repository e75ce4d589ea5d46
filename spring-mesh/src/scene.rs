// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Scene files
//!
//! A scene is plain text, one whitespace-separated record per line, after a
//! header line carrying the format version:
//!
//! ```text
//! #1.0 *** XSpringies data file
//! cmas 1
//! frce 0 1 10 0
//! wall 1 1 1 1
//! mass 1 100 200 0 0 1 1
//! mass 2 160 200 0 0 -1 1
//! spng 1 1 2 1 1 60
//! ```
//!
//! Settings records: `cmas`, `elas`, `kspr`, `kdmp`, `fixm`, `shws`, `cent`,
//! `frce`, `visc`, `stck`, `step`, `prec`, `adpt`, `gsnp` and `wall`.
//! `frce 4 <collide> 0 0` carries the collision flag.
//!
//! Entity records use the file's own numbering: `mass id x y vx vy m elastic`
//! (a negative `m` marks an anchor, zero loads as 1) and
//! `spng id m1 m2 ks kd rest_length`, where `m1`/`m2` are mass numbers.
//!
//! The whole text is parsed before the world is touched, so a malformed file
//! leaves the world unchanged.

use crate::config::{ForceKind, ForceSetting, SimParams, Walls};
use crate::ecs::components::Mass;
use crate::ecs::{EntityBatch, MergeReport, SpringRecord, World, FAKE_MASS, FAKE_SPRING};
use glam::DVec2;
use log::{debug, warn};
use semver::Version;
use std::fmt;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Format version written to the header
pub const FORMAT_VERSION: &str = "1.0";

/// Text following the version on the header line
pub const HEADER_TAG: &str = "*** XSpringies data file";

/// Extension added to scene paths that lack it
pub const EXTENSION: &str = "xsp";

/// Errors from reading or writing scenes
#[derive(Debug)]
pub enum SceneError {
    /// Underlying file error
    Io(io::Error),
    /// The first line is not a `#<version>` header
    MissingHeader,
    /// The header names a version this reader does not understand
    UnsupportedVersion(String),
    /// A record could not be parsed
    Malformed {
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },
    /// The settings parsed but describe parameters the engine cannot run with
    InvalidSettings(String),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::Io(err) => write!(f, "scene I/O error: {}", err),
            SceneError::MissingHeader => write!(f, "missing scene header"),
            SceneError::UnsupportedVersion(v) => write!(f, "unsupported scene version '{}'", v),
            SceneError::Malformed { line, reason } => write!(f, "line {}: {}", line, reason),
            SceneError::InvalidSettings(reason) => write!(f, "invalid scene settings: {}", reason),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SceneError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SceneError {
    fn from(err: io::Error) -> Self {
        SceneError::Io(err)
    }
}

/// How a scene is combined with the current world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Reset the world, then load settings and entities
    Replace,
    /// Add the entities to the world and ignore settings
    ///
    /// When nothing is selected beforehand the new entities become selected.
    Insert,
}

/// A parsed scene, not yet applied
#[derive(Debug, Clone)]
pub struct Scene {
    /// Settings, starting from the defaults
    pub params: SimParams,
    /// Force center in the file's mass numbering
    pub center: Option<i64>,
    /// Masses and springs in the file's numbering
    pub batch: EntityBatch,
}

impl Scene {
    /// Parse scene text
    pub fn parse(text: &str) -> Result<Self, SceneError> {
        let mut lines = text.lines().enumerate();
        let header = lines.next().map(|(_, l)| l).ok_or(SceneError::MissingHeader)?;
        check_header(header)?;

        let mut scene = Scene {
            params: SimParams::default(),
            center: None,
            batch: EntityBatch::default(),
        };

        for (index, line) in lines {
            let mut record = Record::new(line, index + 1);
            let cmd = match record.fields.next() {
                Some(cmd) => cmd,
                None => continue,
            };
            scene.apply(cmd, &mut record)?;
        }
        scene.params.validate().map_err(SceneError::InvalidSettings)?;
        Ok(scene)
    }

    fn apply(&mut self, cmd: &str, record: &mut Record<'_>) -> Result<(), SceneError> {
        let params = &mut self.params;
        match cmd {
            "mass" => {
                let id = record.int()?;
                let position = DVec2::new(record.float()?, record.float()?);
                let velocity = DVec2::new(record.float()?, record.float()?);
                let value = record.float()?;
                let elastic = record.float()?;
                if !value.is_finite() {
                    return Err(record.error(format!("invalid mass value {}", value)));
                }
                if !elastic.is_finite() {
                    return Err(record.error(format!("invalid elasticity {}", elastic)));
                }
                if !position.is_finite() || !velocity.is_finite() {
                    return Err(record.error(format!("mass {} has a non-finite state", id)));
                }
                let magnitude = if value == 0.0 { 1.0 } else { value.abs() };
                let mut mass = Mass::new(magnitude)
                    .with_position(position)
                    .with_velocity(velocity)
                    .with_elasticity(elastic);
                mass.set_fixed(value < 0.0);
                self.batch.masses.push((id, mass));
            }
            "spng" => {
                let spring = SpringRecord {
                    id: record.int()?,
                    m1: record.int()?,
                    m2: record.int()?,
                    ks: record.float()?,
                    kd: record.float()?,
                    rest_length: record.float()?,
                };
                if ![spring.ks, spring.kd, spring.rest_length].iter().all(|v| v.is_finite()) {
                    return Err(record.error(format!("spring {} has a non-finite value", spring.id)));
                }
                self.batch.springs.push(spring);
            }
            "cmas" => params.default_mass = record.float()?,
            "elas" => params.default_elasticity = record.float()?,
            "kspr" => params.default_ks = record.float()?,
            "kdmp" => params.default_kd = record.float()?,
            "fixm" => params.fix_new_masses = record.flag()?,
            "shws" => params.show_springs = record.flag()?,
            "cent" => {
                let id = record.int()?;
                self.center = if id < 0 { None } else { Some(id) };
            }
            "frce" => {
                let which = record.int()?;
                match usize::try_from(which).ok().and_then(ForceKind::from_index) {
                    Some(kind) => {
                        let enabled = record.flag()?;
                        let magnitude = record.float()?;
                        let parameter = record.float()?;
                        *params.force_mut(kind) = ForceSetting {
                            enabled,
                            magnitude,
                            parameter,
                        };
                    }
                    None if which == ForceKind::ALL.len() as i64 => {
                        params.collide = record.flag()?;
                    }
                    None => warn!("line {}: unknown force {}, skipping", record.line, which),
                }
            }
            "visc" => params.viscosity = record.float()?,
            "stck" => params.stickiness = record.float()?,
            "step" => params.time_step = record.float()?,
            "prec" => params.precision = record.float()?,
            "adpt" => params.adaptive = record.flag()?,
            "gsnp" => {
                params.grid_spacing = record.float()?;
                params.grid_snap = record.flag()?;
            }
            "wall" => {
                params.walls = Walls {
                    top: record.flag()?,
                    left: record.flag()?,
                    right: record.flag()?,
                    bottom: record.flag()?,
                };
            }
            other => warn!("line {}: unknown command '{}', skipping", record.line, other),
        }
        Ok(())
    }

    /// Apply the scene to a world
    pub fn apply_to(self, world: &mut World, mode: LoadMode) -> MergeReport {
        let select_new = match mode {
            LoadMode::Replace => {
                world.reset();
                *world.params_mut() = self.params;
                false
            }
            LoadMode::Insert => !world.anything_selected(),
        };

        let report = world.merge(self.batch, select_new);

        if mode == LoadMode::Replace {
            let center = self.center.and_then(|id| report.map.lookup(id));
            if self.center.is_some() && center.is_none() {
                warn!("Center mass {:?} not in scene, clearing", self.center);
            }
            world.params_mut().center = center;
        }

        debug!(
            "Loaded {} masses and {} springs ({} dropped)",
            report.masses.len(),
            report.springs.len(),
            report.dropped_springs
        );
        report
    }
}

fn check_header(line: &str) -> Result<(), SceneError> {
    let token = line
        .split_whitespace()
        .next()
        .and_then(|t| t.strip_prefix('#'))
        .ok_or(SceneError::MissingHeader)?;

    // Headers carry "major.minor"; semver wants a patch component too
    let full = if token.matches('.').count() == 1 {
        format!("{}.0", token)
    } else {
        token.to_string()
    };
    match Version::parse(&full) {
        Ok(version) if version.major == 1 => Ok(()),
        _ => Err(SceneError::UnsupportedVersion(token.to_string())),
    }
}

/// Fields of one record line
struct Record<'a> {
    fields: std::str::SplitWhitespace<'a>,
    line: usize,
}

impl<'a> Record<'a> {
    fn new(text: &'a str, line: usize) -> Self {
        Record {
            fields: text.split_whitespace(),
            line,
        }
    }

    fn error(&self, reason: String) -> SceneError {
        SceneError::Malformed {
            line: self.line,
            reason,
        }
    }

    fn next(&mut self) -> Result<&'a str, SceneError> {
        self.fields
            .next()
            .ok_or_else(|| self.error("missing field".to_string()))
    }

    fn float(&mut self) -> Result<f64, SceneError> {
        let field = self.next()?;
        field
            .parse()
            .map_err(|_| self.error(format!("expected a number, found '{}'", field)))
    }

    fn int(&mut self) -> Result<i64, SceneError> {
        let field = self.next()?;
        field
            .parse()
            .map_err(|_| self.error(format!("expected an integer, found '{}'", field)))
    }

    fn flag(&mut self) -> Result<bool, SceneError> {
        Ok(self.int()? != 0)
    }
}

/// Render a world as scene text
///
/// Only live entities are written, numbered by their handles. The preview
/// sentinels are never written.
pub fn to_text(world: &World) -> String {
    let params = world.params();
    let mut out = String::new();
    let flag = |b: bool| u8::from(b);

    // Writing into a String cannot fail
    let _ = writeln!(out, "#{} {}", FORMAT_VERSION, HEADER_TAG);
    let _ = writeln!(out, "cmas {}", params.default_mass);
    let _ = writeln!(out, "elas {}", params.default_elasticity);
    let _ = writeln!(out, "kspr {}", params.default_ks);
    let _ = writeln!(out, "kdmp {}", params.default_kd);
    let _ = writeln!(out, "fixm {}", flag(params.fix_new_masses));
    let _ = writeln!(out, "shws {}", flag(params.show_springs));
    let center = params.center.map(|c| c.index() as i64).unwrap_or(-1);
    let _ = writeln!(out, "cent {}", center);
    for kind in ForceKind::ALL {
        let force = params.force(kind);
        let _ = writeln!(
            out,
            "frce {} {} {} {}",
            kind.index(),
            flag(force.enabled),
            force.magnitude,
            force.parameter
        );
    }
    let _ = writeln!(out, "frce {} {} 0 0", ForceKind::ALL.len(), flag(params.collide));
    let _ = writeln!(out, "visc {}", params.viscosity);
    let _ = writeln!(out, "stck {}", params.stickiness);
    let _ = writeln!(out, "step {}", params.time_step);
    let _ = writeln!(out, "prec {}", params.precision);
    let _ = writeln!(out, "adpt {}", flag(params.adaptive));
    let _ = writeln!(out, "gsnp {} {}", params.grid_spacing, flag(params.grid_snap));
    let w = params.walls;
    let _ = writeln!(
        out,
        "wall {} {} {} {}",
        flag(w.top),
        flag(w.left),
        flag(w.right),
        flag(w.bottom)
    );

    for (i, mass) in world.masses().iter_alive().filter(|(i, _)| *i != FAKE_MASS.index()) {
        let value = if mass.is_fixed() { -mass.mass } else { mass.mass };
        let _ = writeln!(
            out,
            "mass {} {} {} {} {} {} {}",
            i,
            mass.position.x,
            mass.position.y,
            mass.velocity.x,
            mass.velocity.y,
            value,
            mass.elastic
        );
    }
    let springs = world.springs().iter_alive().filter(|(i, _)| *i != FAKE_SPRING.index());
    for (i, spring) in springs {
        let _ = writeln!(
            out,
            "spng {} {} {} {} {} {}",
            i,
            spring.m1.index(),
            spring.m2.index(),
            spring.ks,
            spring.kd,
            spring.rest_length
        );
    }
    out
}

/// Load scene text into a world
pub fn load_str(world: &mut World, text: &str, mode: LoadMode) -> Result<MergeReport, SceneError> {
    let scene = Scene::parse(text)?;
    Ok(scene.apply_to(world, mode))
}

/// Load a scene file, adding the extension when missing
pub fn load(
    world: &mut World,
    path: impl AsRef<Path>,
    mode: LoadMode,
) -> Result<MergeReport, SceneError> {
    let path = with_extension(path);
    let text = fs::read_to_string(&path)?;
    load_str(world, &text, mode)
}

/// Save a world, adding the extension when missing; returns the path written
pub fn save(world: &World, path: impl AsRef<Path>) -> Result<PathBuf, SceneError> {
    let path = with_extension(path);
    fs::write(&path, to_text(world))?;
    Ok(path)
}

/// Append `.xsp` unless the path already ends with it
pub fn with_extension(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.extension().map(|e| e == EXTENSION).unwrap_or(false) {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(EXTENSION);
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Component, MassId};

    const SAMPLE: &str = "#1.0 *** XSpringies data file
cmas 2
frce 0 1 9.8 0
frce 4 1 0 0
cent 7
wall 0 1 1 1
mass 7 100 200 1 -1 3 0.5
mass 9 160 200 0 0 -2 1
spng 1 7 9 4 0.5 60
";

    #[test]
    fn test_parse_sample() {
        let scene = Scene::parse(SAMPLE).unwrap();
        assert_eq!(scene.params.default_mass, 2.0);
        assert!(scene.params.force(ForceKind::Gravity).enabled);
        assert_eq!(scene.params.force(ForceKind::Gravity).magnitude, 9.8);
        assert!(scene.params.collide);
        assert!(!scene.params.walls.top);
        assert_eq!(scene.center, Some(7));
        assert_eq!(scene.batch.masses.len(), 2);
        assert!(scene.batch.masses[1].1.is_fixed());
        assert_eq!(scene.batch.masses[1].1.mass, 2.0);
        assert_eq!(scene.batch.springs[0].rest_length, 60.0);
    }

    #[test]
    fn test_replace_remaps_center_and_springs() {
        let mut world = World::new();
        world.add_mass(DVec2::new(1.0, 1.0));

        let report = load_str(&mut world, SAMPLE, LoadMode::Replace).unwrap();

        assert_eq!(world.live_mass_count(), 2);
        assert_eq!(report.masses, vec![MassId::new(1), MassId::new(2)]);
        assert_eq!(world.params().center, Some(MassId::new(1)));
        let spring = world.spring(report.springs[0]).unwrap();
        assert_eq!(spring.endpoints(), (MassId::new(1), MassId::new(2)));
    }

    #[test]
    fn test_insert_keeps_settings_and_selects() {
        let mut world = World::new();
        world.add_mass(DVec2::new(1.0, 1.0));

        let report = load_str(&mut world, SAMPLE, LoadMode::Insert).unwrap();

        assert_eq!(world.live_mass_count(), 3);
        assert_eq!(world.params().default_mass, 1.0);
        assert_eq!(world.params().center, None);
        assert!(world.mass(report.masses[0]).unwrap().is_selected());
    }

    #[test]
    fn test_zero_mass_loads_as_one() {
        let text = "#1.0\nmass 1 0 0 0 0 0 1\n";
        let scene = Scene::parse(text).unwrap();
        assert_eq!(scene.batch.masses[0].1.mass, 1.0);
    }

    #[test]
    fn test_header_errors() {
        assert!(matches!(Scene::parse(""), Err(SceneError::MissingHeader)));
        assert!(matches!(Scene::parse("cmas 1\n"), Err(SceneError::MissingHeader)));
        assert!(matches!(
            Scene::parse("#2.0 future\n"),
            Err(SceneError::UnsupportedVersion(_))
        ));
        assert!(matches!(
            Scene::parse("#banana\n"),
            Err(SceneError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_malformed_record_leaves_world_alone() {
        let mut world = World::new();
        let a = world.add_mass(DVec2::new(1.0, 1.0));
        let text = "#1.0\nmass 1 0 0 0 0 1 1\nspng 1 1 x 1 1 1\n";

        let err = load_str(&mut world, text, LoadMode::Replace).unwrap_err();
        assert!(matches!(err, SceneError::Malformed { line: 3, .. }));
        assert!(world.mass(a).unwrap().is_alive());
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        for bad in ["cmas 0", "cmas -2", "step NaN", "step 0", "prec inf", "elas NaN", "visc -1"] {
            let text = format!("#1.0\n{}\nmass 1 0 0 0 0 1 1\n", bad);
            let err = Scene::parse(&text).unwrap_err();
            assert!(matches!(err, SceneError::InvalidSettings(_)), "{}: {}", bad, err);
        }
    }

    #[test]
    fn test_invalid_settings_leave_world_usable() {
        let mut world = World::new();
        let a = world.add_mass(DVec2::new(100.0, 100.0));

        assert!(load_str(&mut world, "#1.0\ncmas 0\n", LoadMode::Replace).is_err());
        assert!(load_str(&mut world, "#1.0\nstep NaN\n", LoadMode::Insert).is_err());

        assert!(world.mass(a).unwrap().is_alive());
        assert!(world.params().validate().is_ok());
        let b = world.add_mass(DVec2::new(150.0, 100.0));
        assert_eq!(world.mass(b).unwrap().mass, 1.0);
    }

    #[test]
    fn test_non_finite_records_are_malformed() {
        let cases = [
            "mass 1 0 0 0 0 1 NaN",
            "mass 1 inf 0 0 0 1 1",
            "mass 1 0 0 0 NaN 1 1",
            "spng 1 1 2 NaN 1 1",
        ];
        for record in cases {
            let text = format!("#1.0\nmass 2 5 5 0 0 1 1\n{}\n", record);
            let err = Scene::parse(&text).unwrap_err();
            assert!(matches!(err, SceneError::Malformed { line: 3, .. }), "{}", record);
        }
    }

    #[test]
    fn test_unknown_commands_are_skipped() {
        let scene = Scene::parse("#1.0\nzzzz 1 2 3\n\nvisc 0.5\n").unwrap();
        assert_eq!(scene.params.viscosity, 0.5);
    }

    #[test]
    fn test_text_round_trip() {
        let mut world = World::new();
        let a = world.add_mass(DVec2::new(10.5, 20.25));
        let b = world.add_mass(DVec2::new(70.0, 20.0));
        world.mass_mut(b).unwrap().set_fixed(true);
        world.add_spring(a, b).unwrap();
        world.params_mut().stickiness = 3.0;

        let mut loaded = World::new();
        load_str(&mut loaded, &to_text(&world), LoadMode::Replace).unwrap();

        assert_eq!(loaded.live_mass_count(), 2);
        assert_eq!(loaded.live_spring_count(), 1);
        assert_eq!(loaded.mass(a).unwrap().position, DVec2::new(10.5, 20.25));
        assert!(loaded.mass(b).unwrap().is_fixed());
        assert_eq!(loaded.params().stickiness, 3.0);
    }

    #[test]
    fn test_preview_spring_is_not_saved() {
        let mut world = World::new();
        let a = world.add_mass(DVec2::new(10.0, 10.0));
        world.attach_fake_spring(a);

        let text = to_text(&world);
        assert!(!text.contains("spng"));
        assert_eq!(text.matches("mass ").count(), 1);
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(with_extension("scene"), PathBuf::from("scene.xsp"));
        assert_eq!(with_extension("scene.xsp"), PathBuf::from("scene.xsp"));
        assert_eq!(with_extension("a.txt"), PathBuf::from("a.txt.xsp"));
    }

    #[test]
    fn test_error_display() {
        let err = SceneError::Malformed {
            line: 4,
            reason: "missing field".to_string(),
        };
        assert_eq!(err.to_string(), "line 4: missing field");

        let err = SceneError::InvalidSettings("Invalid default mass: 0".to_string());
        assert_eq!(err.to_string(), "invalid scene settings: Invalid default mass: 0");
    }
}
