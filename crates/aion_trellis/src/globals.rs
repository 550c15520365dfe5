//! Parsers for per-device `globals.json` files.
//!
//! Global clock distribution is described differently per family, so there
//! is no shared schema: each family shape has its own record types and its
//! own parser, and [`GlobalsInfo`] ties them together as a sum type. The
//! family is chosen by the caller before parsing; the content is never used
//! to guess the shape.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::entries::Entries;
use crate::error::{DatabaseError, DatabaseResult};

/// Globals layout families known to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// ECP5 quadrant/tap/spine layout.
    Ecp5,
    /// MachXO2-style column/row connection layout, also used by MachXO3.
    MachXO2,
}

impl Family {
    /// Classifies a catalog family name, returning `None` for families
    /// without a known globals layout.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ECP5" => Some(Self::Ecp5),
            "MachXO2" | "MachXO3" | "MachXO3D" => Some(Self::MachXO2),
            _ => None,
        }
    }
}

/// Global routing topology of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalsInfo {
    /// ECP5 globals.
    Ecp5(Ecp5Globals),
    /// MachXO2 globals.
    MachXO2(MachXO2Globals),
}

impl GlobalsInfo {
    /// Returns the layout family of this value.
    pub fn family(&self) -> Family {
        match self {
            Self::Ecp5(_) => Family::Ecp5,
            Self::MachXO2(_) => Family::MachXO2,
        }
    }

    /// Returns the ECP5 globals, if this is an ECP5 layout.
    pub fn as_ecp5(&self) -> Option<&Ecp5Globals> {
        match self {
            Self::Ecp5(g) => Some(g),
            Self::MachXO2(_) => None,
        }
    }

    /// Returns the MachXO2 globals, if this is a MachXO2 layout.
    pub fn as_machxo2(&self) -> Option<&MachXO2Globals> {
        match self {
            Self::MachXO2(g) => Some(g),
            Self::Ecp5(_) => None,
        }
    }
}

/// Parses globals JSON using the layout of `family`.
pub fn parse_globals(family: Family, json: &str) -> DatabaseResult<GlobalsInfo> {
    match family {
        Family::Ecp5 => parse_ecp5_globals(json).map(GlobalsInfo::Ecp5),
        Family::MachXO2 => parse_machxo2_globals(json).map(GlobalsInfo::MachXO2),
    }
}

// ECP5

/// A clock quadrant: a named rectangle of the tile grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalRegion {
    /// Quadrant name, e.g. `UL`.
    pub name: String,
    /// First column.
    pub x0: i32,
    /// Last column.
    pub x1: i32,
    /// First row.
    pub y0: i32,
    /// Last row.
    pub y1: i32,
}

impl GlobalRegion {
    /// Returns `true` if the grid location lies inside this region.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

/// Columns driven to the left and right of one TAP column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapSegment {
    /// The TAP driver column.
    pub tap_col: i32,
    /// First column driven to the left.
    pub lx0: i32,
    /// Last column driven to the left.
    pub lx1: i32,
    /// First column driven to the right.
    pub rx0: i32,
    /// Last column driven to the right.
    pub rx1: i32,
}

/// Location of the spine feeding one TAP column within a quadrant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineSegment {
    /// The quadrant this spine belongs to.
    pub quadrant: String,
    /// The TAP column it feeds.
    pub tap_col: i32,
    /// Row of the spine tile.
    pub spine_row: i32,
    /// Column of the spine tile.
    pub spine_col: i32,
}

/// ECP5 global network description, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ecp5Globals {
    /// Clock quadrants.
    pub quadrants: Vec<GlobalRegion>,
    /// TAP segments.
    pub tapsegs: Vec<TapSegment>,
    /// Spine segments.
    pub spinesegs: Vec<SpineSegment>,
}

impl Ecp5Globals {
    /// Returns the first quadrant containing the grid location.
    pub fn quadrant_at(&self, x: i32, y: i32) -> Option<&GlobalRegion> {
        self.quadrants.iter().find(|q| q.contains(x, y))
    }
}

#[derive(Deserialize)]
struct RawEcp5Globals {
    quadrants: IndexMap<String, RawQuadrant>,
    taps: IndexMap<String, RawTap>,
    spines: IndexMap<String, RawSpine>,
}

#[derive(Deserialize)]
struct RawQuadrant {
    x0: i32,
    x1: i32,
    y0: i32,
    y1: i32,
}

#[derive(Deserialize)]
struct RawTap {
    lx0: i32,
    lx1: i32,
    rx0: i32,
    rx1: i32,
}

#[derive(Deserialize)]
struct RawSpine {
    x: i32,
    y: i32,
}

fn parse_key_int(section: &str, key: &str, digits: &str) -> DatabaseResult<i32> {
    digits
        .parse()
        .map_err(|_| DatabaseError::parse(format!("{section}: malformed key '{key}'")))
}

/// Splits a tap key such as `C12` into its column.
fn parse_tap_key(key: &str) -> DatabaseResult<i32> {
    let col = key
        .strip_prefix('C')
        .ok_or_else(|| DatabaseError::parse(format!("taps: key '{key}' does not start with 'C'")))?;
    parse_key_int("taps", key, col)
}

/// Splits a spine key such as `UL12` into quadrant name and TAP column.
fn parse_spine_key(key: &str) -> DatabaseResult<(String, i32)> {
    match (key.get(..2), key.get(2..)) {
        (Some(quadrant), Some(col)) => {
            Ok((quadrant.to_string(), parse_key_int("spines", key, col)?))
        }
        _ => Err(DatabaseError::parse(format!("spines: malformed key '{key}'"))),
    }
}

/// Parses ECP5 `globals.json` content.
///
/// # Errors
///
/// Returns [`DatabaseError::Parse`] if a section is missing or a tap/spine
/// key is not of the form `C<col>` / `<quadrant><col>`.
pub fn parse_ecp5_globals(json: &str) -> DatabaseResult<Ecp5Globals> {
    let raw: RawEcp5Globals =
        serde_json::from_str(json).map_err(|e| DatabaseError::parse(e.to_string()))?;

    let quadrants = raw
        .quadrants
        .into_iter()
        .map(|(name, q)| GlobalRegion {
            name,
            x0: q.x0,
            x1: q.x1,
            y0: q.y0,
            y1: q.y1,
        })
        .collect();

    let tapsegs = raw
        .taps
        .iter()
        .map(|(key, t)| {
            Ok(TapSegment {
                tap_col: parse_tap_key(key)?,
                lx0: t.lx0,
                lx1: t.lx1,
                rx0: t.rx0,
                rx1: t.rx1,
            })
        })
        .collect::<DatabaseResult<_>>()?;

    let spinesegs = raw
        .spines
        .iter()
        .map(|(key, s)| {
            let (quadrant, tap_col) = parse_spine_key(key)?;
            Ok(SpineSegment {
                quadrant,
                tap_col,
                spine_row: s.y,
                spine_col: s.x,
            })
        })
        .collect::<DatabaseResult<_>>()?;

    Ok(Ecp5Globals {
        quadrants,
        tapsegs,
        spinesegs,
    })
}

// MachXO2

/// A left/right global connection along one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeftRightConn {
    /// Connection name.
    pub name: String,
    /// Row carrying the connection.
    pub row: i32,
    /// First and last row reached.
    pub row_span: (i32, i32),
}

/// Global indices whose DCC is absent in a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDccs {
    /// The row.
    pub row: i32,
    /// Missing global indices.
    pub missing: Vec<i32>,
}

/// MachXO2 global network description.
///
/// `ud_conns` and `branch_spans` are indexed by column and agree element for
/// element: `branch_spans[c][i]` is the span of global `ud_conns[c][i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachXO2Globals {
    /// Left/right connections in file order.
    pub lr_conns: Vec<LeftRightConn>,
    /// Per-column global indices with up/down connections.
    pub ud_conns: Vec<Vec<i32>>,
    /// Per-column (begin, end) branch spans.
    pub branch_spans: Vec<Vec<(i32, i32)>>,
    /// Per-row missing DCCs in file order.
    pub missing_dccs: Vec<MissingDccs>,
}

impl MachXO2Globals {
    /// Returns the branch span of `global` in column `col`, if that column
    /// declares the global.
    pub fn branch_span(&self, col: usize, global: i32) -> Option<(i32, i32)> {
        let idx = self.ud_conns.get(col)?.iter().position(|&g| g == global)?;
        self.branch_spans.get(col)?.get(idx).copied()
    }
}

#[derive(Deserialize)]
struct RawMachXO2Globals {
    #[serde(rename = "lr-conns")]
    lr_conns: Entries<RawLeftRightConn>,
    #[serde(rename = "ud-conns")]
    ud_conns: Entries<Vec<i32>>,
    #[serde(rename = "branch-spans")]
    branch_spans: Entries<Entries<(i32, i32)>>,
    #[serde(rename = "missing-dccs")]
    missing_dccs: Entries<Vec<i32>>,
}

#[derive(Deserialize)]
struct RawLeftRightConn {
    row: i32,
    #[serde(rename = "row-span")]
    row_span: (i32, i32),
}

/// Checks that a column key names the column expected at this position.
///
/// Columns are written as string keys so the JSON stays readable, but the
/// arrays they populate are positional.
fn check_column(section: &str, key: &str, expected: usize) -> DatabaseResult<()> {
    let col: usize = key
        .parse()
        .map_err(|_| DatabaseError::parse(format!("{section}: column key '{key}' is not an integer")))?;
    if col != expected {
        return Err(DatabaseError::consistency(format!(
            "{section}: expected column {expected}, found column {col}"
        )));
    }
    Ok(())
}

/// Parses MachXO2 `globals.json` content.
///
/// # Errors
///
/// Returns [`DatabaseError::Parse`] for malformed JSON or keys, and
/// [`DatabaseError::Consistency`] if columns are out of order or a column's
/// branch spans do not match its up/down connections.
pub fn parse_machxo2_globals(json: &str) -> DatabaseResult<MachXO2Globals> {
    let raw: RawMachXO2Globals =
        serde_json::from_str(json).map_err(|e| DatabaseError::parse(e.to_string()))?;

    let lr_conns = raw
        .lr_conns
        .into_iter()
        .map(|(name, lr)| LeftRightConn {
            name,
            row: lr.row,
            row_span: lr.row_span,
        })
        .collect();

    let mut ud_conns = Vec::with_capacity(raw.ud_conns.len());
    for (col, (key, globals)) in raw.ud_conns.into_iter().enumerate() {
        check_column("ud-conns", &key, col)?;
        ud_conns.push(globals);
    }

    if raw.branch_spans.len() != ud_conns.len() {
        return Err(DatabaseError::consistency(format!(
            "branch-spans has {} columns but ud-conns has {}",
            raw.branch_spans.len(),
            ud_conns.len()
        )));
    }

    let mut branch_spans = Vec::with_capacity(ud_conns.len());
    for (col, ((key, spans), globals)) in raw.branch_spans.iter().zip(&ud_conns).enumerate() {
        check_column("branch-spans", key, col)?;
        if spans.len() != globals.len() {
            return Err(DatabaseError::consistency(format!(
                "column {col}: {} branch spans for {} up/down connections",
                spans.len(),
                globals.len()
            )));
        }
        let column = globals
            .iter()
            .map(|global| {
                spans.first(&global.to_string()).copied().ok_or_else(|| {
                    DatabaseError::consistency(format!(
                        "column {col}: no branch span for global {global}"
                    ))
                })
            })
            .collect::<DatabaseResult<Vec<_>>>()?;
        branch_spans.push(column);
    }

    let missing_dccs = raw
        .missing_dccs
        .into_iter()
        .map(|(key, missing)| {
            Ok(MissingDccs {
                row: parse_key_int("missing-dccs", &key, &key)?,
                missing,
            })
        })
        .collect::<DatabaseResult<_>>()?;

    Ok(MachXO2Globals {
        lr_conns,
        ud_conns,
        branch_spans,
        missing_dccs,
    })
}
