//! Parser for per-tile-type `bits.db` files.
//!
//! A bits database maps the configurable features of one tile type to the
//! configuration bits that enable them. Positions are relative to the tile's
//! frame/bit window from the tilegrid.
//!
//! # Format
//!
//! ```text
//! .mux R0C0_A0
//! R0C0_H02W0701 F3B16 !F4B16
//! R0C0_H00R0000 -
//!
//! .config SLICEA.K0.INIT 0000
//! F12B3
//! F12B4
//! -
//! !F13B2
//!
//! .config_enum SLICEA.MODE LOGIC
//! LOGIC -
//! CCU2 F16B24
//!
//! .fixed_conn R0C0_JF0 R0C0_F0_SLICE
//! ```
//!
//! Blocks end at a blank line or the next directive. Each bit is written
//! `F<frame>B<bit>`; a leading `!` means the bit must be clear, and `-`
//! stands for an empty group. Lines starting with `#` are comments.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;

use crate::error::{DatabaseError, DatabaseResult};

/// One configuration bit relative to a tile's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigBit {
    /// Frame offset within the tile.
    pub frame: usize,
    /// Bit offset within the tile's part of the frame.
    pub bit: usize,
    /// If true, the bit must be 0 for the feature to be active.
    pub inverted: bool,
}

impl fmt::Display for ConfigBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverted {
            f.write_str("!")?;
        }
        write!(f, "F{}B{}", self.frame, self.bit)
    }
}

/// A set of bits that are set together.
pub type BitGroup = BTreeSet<ConfigBit>;

/// Parses a single bit like `F12B3` or `!F4B16`.
pub fn parse_config_bit(token: &str) -> DatabaseResult<ConfigBit> {
    let (inverted, rest) = match token.strip_prefix('!') {
        Some(s) => (true, s),
        None => (false, token),
    };
    let invalid =
        || DatabaseError::parse(format!("invalid bit '{token}': expected F<frame>B<bit>"));
    let (frame, bit) = rest
        .strip_prefix('F')
        .and_then(|s| s.split_once('B'))
        .ok_or_else(invalid)?;
    Ok(ConfigBit {
        frame: frame.parse().map_err(|_| invalid())?,
        bit: bit.parse().map_err(|_| invalid())?,
        inverted,
    })
}

/// Parses a whitespace-separated bit group; a lone `-` is the empty group.
fn parse_bit_group<'a>(tokens: impl IntoIterator<Item = &'a str>) -> DatabaseResult<BitGroup> {
    let mut group = BitGroup::new();
    for token in tokens {
        if token != "-" {
            group.insert(parse_config_bit(token)?);
        }
    }
    Ok(group)
}

/// The arcs into one routing sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MuxBits {
    /// The sink wire.
    pub sink: String,
    /// Source wire to the bits that select it, in file order.
    pub arcs: IndexMap<String, BitGroup>,
}

/// A multi-bit setting such as a LUT initialization value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordSetting {
    /// Setting name.
    pub name: String,
    /// Default value as written in the file.
    pub default: String,
    /// One group per bit of the word, least significant first.
    pub bits: Vec<BitGroup>,
}

/// A setting that takes one of several named values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumSetting {
    /// Setting name.
    pub name: String,
    /// Default option, if the file names one.
    pub default: Option<String>,
    /// Option name to the bits that select it, in file order.
    pub options: IndexMap<String, BitGroup>,
}

/// A connection that exists without any configuration bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedConnection {
    /// The sink wire.
    pub sink: String,
    /// The source wire.
    pub source: String,
}

/// The bit-pattern database of one tile type.
///
/// Immutable once parsed. The database layer hands these out behind an
/// [`Arc`](std::sync::Arc) shared by every tile of the same type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileBitDatabase {
    muxes: IndexMap<String, MuxBits>,
    words: IndexMap<String, WordSetting>,
    enums: IndexMap<String, EnumSetting>,
    fixed_conns: Vec<FixedConnection>,
}

enum Block {
    Mux(MuxBits),
    Word(WordSetting),
    Enum(EnumSetting),
}

impl TileBitDatabase {
    /// Parses `bits.db` content.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Parse`] naming the offending line if a
    /// directive is unknown or incomplete, a bit is malformed, or data
    /// appears outside a block.
    pub fn parse(content: &str) -> DatabaseResult<Self> {
        let mut db = Self::default();
        let mut block: Option<Block> = None;

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            let at_line = |e: DatabaseError| match e {
                DatabaseError::Parse { reason, .. } => {
                    DatabaseError::parse(format!("line {}: {reason}", line_no + 1))
                }
                other => other,
            };

            if line.starts_with('#') {
                continue;
            }
            if line.is_empty() {
                db.finish(block.take());
                continue;
            }

            let mut tokens = line.split_whitespace();
            if line.starts_with('.') {
                db.finish(block.take());
                block = db.directive(&mut tokens).map_err(at_line)?;
                continue;
            }

            match block.as_mut() {
                Some(Block::Mux(mux)) => {
                    let source = tokens.next().unwrap_or_default().to_string();
                    let bits = parse_bit_group(tokens).map_err(at_line)?;
                    mux.arcs.insert(source, bits);
                }
                Some(Block::Word(word)) => {
                    word.bits.push(parse_bit_group(tokens).map_err(at_line)?);
                }
                Some(Block::Enum(setting)) => {
                    let option = tokens.next().unwrap_or_default().to_string();
                    let bits = parse_bit_group(tokens).map_err(at_line)?;
                    setting.options.insert(option, bits);
                }
                None => {
                    return Err(at_line(DatabaseError::parse(format!(
                        "'{line}' is outside of any block"
                    ))));
                }
            }
        }
        db.finish(block);
        Ok(db)
    }

    /// Handles a `.directive` line, returning the block it opens, if any.
    fn directive<'a>(
        &mut self,
        tokens: &mut impl Iterator<Item = &'a str>,
    ) -> DatabaseResult<Option<Block>> {
        let directive = tokens.next().unwrap_or_default();
        let mut arg = |what: &str| {
            tokens
                .next()
                .map(str::to_string)
                .ok_or_else(|| DatabaseError::parse(format!("{directive}: missing {what}")))
        };
        match directive {
            ".mux" => Ok(Some(Block::Mux(MuxBits {
                sink: arg("sink")?,
                arcs: IndexMap::new(),
            }))),
            ".config" => Ok(Some(Block::Word(WordSetting {
                name: arg("name")?,
                default: arg("default")?,
                bits: Vec::new(),
            }))),
            ".config_enum" => Ok(Some(Block::Enum(EnumSetting {
                name: arg("name")?,
                default: arg("default").ok(),
                options: IndexMap::new(),
            }))),
            ".fixed_conn" => {
                let sink = arg("sink")?;
                let source = arg("source")?;
                self.fixed_conns.push(FixedConnection { sink, source });
                Ok(None)
            }
            other => Err(DatabaseError::parse(format!("unknown directive '{other}'"))),
        }
    }

    fn finish(&mut self, block: Option<Block>) {
        match block {
            Some(Block::Mux(mux)) => {
                self.muxes.insert(mux.sink.clone(), mux);
            }
            Some(Block::Word(word)) => {
                self.words.insert(word.name.clone(), word);
            }
            Some(Block::Enum(setting)) => {
                self.enums.insert(setting.name.clone(), setting);
            }
            None => {}
        }
    }

    /// Returns the arcs into `sink`.
    pub fn mux(&self, sink: &str) -> Option<&MuxBits> {
        self.muxes.get(sink)
    }

    /// Returns the word setting called `name`.
    pub fn word(&self, name: &str) -> Option<&WordSetting> {
        self.words.get(name)
    }

    /// Returns the enum setting called `name`.
    pub fn enumeration(&self, name: &str) -> Option<&EnumSetting> {
        self.enums.get(name)
    }

    /// Iterates over all muxes in file order.
    pub fn muxes(&self) -> impl Iterator<Item = &MuxBits> {
        self.muxes.values()
    }

    /// Iterates over all word settings in file order.
    pub fn words(&self) -> impl Iterator<Item = &WordSetting> {
        self.words.values()
    }

    /// Iterates over all enum settings in file order.
    pub fn enumerations(&self) -> impl Iterator<Item = &EnumSetting> {
        self.enums.values()
    }

    /// Returns the fixed connections in file order.
    pub fn fixed_connections(&self) -> &[FixedConnection] {
        &self.fixed_conns
    }

    /// Returns `true` if the database defines nothing.
    pub fn is_empty(&self) -> bool {
        self.muxes.is_empty()
            && self.words.is_empty()
            && self.enums.is_empty()
            && self.fixed_conns.is_empty()
    }
}
