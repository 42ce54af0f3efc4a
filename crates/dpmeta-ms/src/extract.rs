//! ObsCore attribute extraction from a MeasurementSet.
//!
//! Each sub-table contributes a handful of attributes to an intermediate
//! dictionary. A sub-table that is absent (or empty) is reported as a warning
//! and contributes nothing; its attributes stay unset rather than being
//! defaulted. The dictionary is then merged into an [`ObsCore`] record through
//! a lookup that warns about, and leaves unset, every key that is missing.
//!
//! Anything else that goes wrong while reading (a missing column, a cell of
//! the wrong type) is an error.

use std::collections::BTreeMap;

use dpmeta_core::model::obscore::{AntennaDiameter, ObsCore};
use tracing::{debug, warn};

use crate::table::{Table, TableError, TableResult, TableSource};

pub const ANTENNA: &str = "ANTENNA";
pub const OBSERVATION: &str = "OBSERVATION";
pub const SPECTRAL_WINDOW: &str = "SPECTRAL_WINDOW";
pub const POLARIZATION: &str = "POLARIZATION";
pub const POINTING: &str = "POINTING";

/// Sub-tables the extractor reads.
pub const SUBTABLES: [&str; 5] = [ANTENNA, OBSERVATION, SPECTRAL_WINDOW, POLARIZATION, POINTING];

const SECONDS_PER_DAY: f64 = 86_400.0;
const HZ_PER_MHZ: f64 = 1e6;

/// An extracted attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    Float(f64),
    Count(u64),
    Text(String),
    Diameter(AntennaDiameter),
}

impl Attr {
    fn float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn count(&self) -> Option<u64> {
        match self {
            Self::Count(v) => Some(*v),
            _ => None,
        }
    }

    fn text(&self) -> Option<String> {
        match self {
            Self::Text(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn diameter(&self) -> Option<AntennaDiameter> {
        match self {
            Self::Diameter(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Attributes pulled from a dataset, plus the warnings raised on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub attrs: BTreeMap<&'static str, Attr>,
    pub warnings: Vec<String>,
}

impl Extraction {
    pub fn get(&self, key: &str) -> Option<&Attr> {
        self.attrs.get(key)
    }

    fn set(&mut self, key: &'static str, value: Attr) {
        self.attrs.insert(key, value);
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }

    /// Lookup with default: a missing key yields `None` and a warning.
    fn lookup(&mut self, key: &str) -> Option<Attr> {
        match self.attrs.get(key) {
            Some(v) => Some(v.clone()),
            None => {
                self.warn(format!("could not find value '{key}'"));
                None
            }
        }
    }

    /// Write every extractable attribute into `obscore`.
    ///
    /// Keys absent from the extraction set their attribute to `None`.
    pub fn merge_into(&mut self, obscore: &mut ObsCore) {
        obscore.ant_number = self.lookup("ant_number").and_then(|a| a.count());
        obscore.instrument_ant_diameter =
            self.lookup("instrument_ant_diameter").and_then(|a| a.diameter());
        obscore.facility_name = self.lookup("facility_name").and_then(|a| a.text());
        obscore.instrument_name = self.lookup("instrument_name").and_then(|a| a.text());
        obscore.obs_publisher_did = self.lookup("obs_publisher_did").and_then(|a| a.text());
        obscore.t_min = self.lookup("t_min").and_then(|a| a.float());
        obscore.t_max = self.lookup("t_max").and_then(|a| a.float());
        obscore.t_exptime = self.lookup("t_exptime").and_then(|a| a.float());
        obscore.t_resolution = self.lookup("t_resolution").and_then(|a| a.float());
        obscore.f_min = self.lookup("f_min").and_then(|a| a.float());
        obscore.f_max = self.lookup("f_max").and_then(|a| a.float());
        obscore.em_xel = self.lookup("em_xel").and_then(|a| a.count());
        obscore.pol_states = self.lookup("pol_states").and_then(|a| a.text());
        obscore.pol_xel = self.lookup("pol_xel").and_then(|a| a.count());
        obscore.s_ra = self.lookup("s_ra").and_then(|a| a.float());
        obscore.s_dec = self.lookup("s_dec").and_then(|a| a.float());
        obscore.target_name = self.lookup("target_name").and_then(|a| a.text());
    }
}

/// Read all supported attributes from `source`.
pub fn extract(source: &dyn TableSource) -> TableResult<Extraction> {
    let mut out = Extraction::default();
    debug!(
        dataset = source.name(),
        subtables = ?source.subtable_names(),
        "extracting obscore attributes"
    );

    extract_main(source.main_table(), &mut out)?;

    if let Some(t) = open_subtable(source, ANTENNA, &mut out)? {
        extract_antenna(t, &mut out)?;
    }
    if let Some(t) = open_subtable(source, OBSERVATION, &mut out)? {
        extract_observation(t, &mut out)?;
    }
    if let Some(t) = open_subtable(source, SPECTRAL_WINDOW, &mut out)? {
        extract_spectral_window(t, &mut out)?;
    }
    if let Some(t) = open_subtable(source, POLARIZATION, &mut out)? {
        extract_polarization(t, &mut out)?;
    }
    if let Some(t) = open_subtable(source, POINTING, &mut out)? {
        extract_pointing(t, &mut out)?;
    }
    Ok(out)
}

fn open_subtable<'a>(
    source: &'a dyn TableSource,
    name: &str,
    out: &mut Extraction,
) -> TableResult<Option<&'a dyn Table>> {
    let table = source.subtable(name)?;
    if table.is_none() {
        out.warn(format!("Missing sub-table: {name}"));
    }
    Ok(table)
}

/// True when the table has rows; warns otherwise.
fn has_rows(table: &dyn Table, out: &mut Extraction) -> bool {
    if table.nrows() == 0 {
        out.warn(format!("{} table has 0 rows", table.name()));
        return false;
    }
    true
}

fn extract_main(table: &dyn Table, out: &mut Extraction) -> TableResult<()> {
    if !has_rows(table, out) {
        return Ok(());
    }
    out.set("t_resolution", Attr::Float(table.get_f64("INTERVAL", 0)?));
    Ok(())
}

fn extract_antenna(table: &dyn Table, out: &mut Extraction) -> TableResult<()> {
    let diameters = (0..table.nrows())
        .map(|row| table.get_f64("DISH_DIAMETER", row))
        .collect::<TableResult<Vec<_>>>()?;
    out.set("instrument_ant_diameter", Attr::Diameter(check_diameter(&diameters)));
    out.set("ant_number", Attr::Count(table.nrows() as u64));
    Ok(())
}

fn extract_observation(table: &dyn Table, out: &mut Extraction) -> TableResult<()> {
    if !has_rows(table, out) {
        return Ok(());
    }
    let range = table.get_f64_array("TIME_RANGE", 0)?;
    let (first, last) = first_last(&range, table, "TIME_RANGE")?;

    out.set("facility_name", Attr::Text(table.get_string("OBSERVER", 0)?));
    out.set("obs_publisher_did", Attr::Text(table.get_string("PROJECT", 0)?));
    out.set("instrument_name", Attr::Text(table.get_string("TELESCOPE_NAME", 0)?));
    out.set("t_min", Attr::Float(seconds_to_mjd(first)));
    out.set("t_max", Attr::Float(seconds_to_mjd(last)));
    out.set("t_exptime", Attr::Float(last - first));
    Ok(())
}

fn extract_spectral_window(table: &dyn Table, out: &mut Extraction) -> TableResult<()> {
    if !has_rows(table, out) {
        return Ok(());
    }
    // multiple windows are not aggregated: the last row wins
    for row in 0..table.nrows() {
        let freqs = table.get_f64_array("CHAN_FREQ", row)?;
        let (first, last) = first_last(&freqs, table, "CHAN_FREQ")?;
        out.set("f_min", Attr::Float(first / HZ_PER_MHZ));
        out.set("f_max", Attr::Float(last / HZ_PER_MHZ));
        out.set("em_xel", Attr::Count(non_negative(table, "NUM_CHAN", row)?));
    }
    if table.nrows() > 1 {
        out.warn(format!(
            "table {} has {} rows, using the last one",
            table.name(),
            table.nrows()
        ));
    }
    Ok(())
}

fn extract_polarization(table: &dyn Table, out: &mut Extraction) -> TableResult<()> {
    if !has_rows(table, out) {
        return Ok(());
    }
    let corr_types = table.get_i64_array("CORR_TYPE", 0)?;
    out.set("pol_states", Attr::Text(stokes_polarisations(&corr_types)));
    out.set("pol_xel", Attr::Count(non_negative(table, "NUM_CORR", 0)?));
    Ok(())
}

fn extract_pointing(table: &dyn Table, out: &mut Extraction) -> TableResult<()> {
    if table.nrows() == 0 {
        out.warn(format!("{} table has 0 rows", table.name()));
        return Ok(());
    }
    let target = table.get_f64_matrix("TARGET", 0)?;
    let direction = target
        .first()
        .filter(|d| d.len() >= 2)
        .ok_or_else(|| {
            TableError::shape(table.name(), "TARGET needs at least one (ra, dec) pair")
        })?;
    out.set("s_ra", Attr::Float(direction[0]));
    out.set("s_dec", Attr::Float(direction[1]));
    out.set("target_name", Attr::Text(table.get_string("NAME", 0)?));
    Ok(())
}

fn first_last(values: &[f64], table: &dyn Table, column: &str) -> TableResult<(f64, f64)> {
    match (values.first(), values.last()) {
        (Some(f), Some(l)) => Ok((*f, *l)),
        _ => Err(TableError::shape(
            table.name(),
            format!("{column} is empty"),
        )),
    }
}

fn non_negative(table: &dyn Table, column: &str, row: usize) -> TableResult<u64> {
    let v = table.get_i64(column, row)?;
    u64::try_from(v).map_err(|_| {
        TableError::shape(table.name(), format!("{column}[{row}] is negative: {v}"))
    })
}

/// Common dish diameter, `"various"` when they differ, `""` when there are none.
pub fn check_diameter(diameters: &[f64]) -> AntennaDiameter {
    match diameters.split_first() {
        None => AntennaDiameter::Label(String::new()),
        Some((first, rest)) if rest.iter().all(|d| d == first) => AntennaDiameter::Metres(*first),
        Some(_) => AntennaDiameter::various(),
    }
}

/// Correlation type codes to polarisation labels, joined with `/`.
///
/// Codes outside 5..=12 are dropped.
pub fn stokes_polarisations(corr_types: &[i64]) -> String {
    corr_types
        .iter()
        .filter_map(|code| match code {
            5 => Some("RR"),
            6 => Some("RL"),
            7 => Some("LR"),
            8 => Some("LL"),
            9 => Some("XX"),
            10 => Some("XY"),
            11 => Some("YX"),
            12 => Some("YY"),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Seconds since MJD 0 (TAI) to MJD.
pub fn seconds_to_mjd(seconds: f64) -> f64 {
    seconds / SECONDS_PER_DAY
}
