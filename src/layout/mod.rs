//! Builders for the OpenType Layout tables GSUB and GPOS.
//!
//! Both tables share the same structure: a list of scripts whose language
//! systems select features, a list of features which select lookups and a
//! list of lookups which own their subtables. Subtables are supplied as
//! encoded bytes and never looked into. When a table is written, the graph is
//! laid out with 16-bit offsets and lookups whose subtables cannot be reached
//! anymore are moved behind Extension subtables (see [`pack`](self::pack)).
//!
//! Base layout tables are not decoded into builders, but can be inspected
//! with the zero-copy [`LayoutTableRef`].

mod pack;
mod read;
mod variations;

pub use self::read::{LayoutTableRef, LookupRef, SubtableRef};
pub use self::variations::{
    Condition, F2Dot14, FeatureSubstitution, FeatureVariationRecord, FeatureVariations,
};

use crate::table::{builder_conversions, Table};
use crate::{Font, Result, Tag};
use std::ops::{Deref, DerefMut};

/// The lookup flag bit that says a mark filtering set follows the subtable
/// offsets.
pub const USE_MARK_FILTERING_SET: u16 = 0x0010;

/// The Extension lookup type of GSUB.
pub const GSUB_EXTENSION: u16 = 7;

/// The Extension lookup type of GPOS.
pub const GPOS_EXTENSION: u16 = 9;

/// The script, feature and lookup graph of a GSUB or GPOS table.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct LayoutTable {
    /// The scripts. They are written sorted by tag.
    pub scripts: Vec<Script>,
    /// The features. They are written sorted by tag (keeping the order of
    /// features with the same tag) and all feature indices are remapped
    /// accordingly.
    pub features: Vec<Feature>,
    /// The lookups, in the order in which they are applied.
    pub lookups: Vec<Lookup>,
    /// Alternate features for regions of the design space. Their presence
    /// makes the table version 1.1.
    pub variations: Option<FeatureVariations>,
}

/// A script and its language systems.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Script {
    /// The script tag, e.g. `latn`.
    pub tag: Tag,
    /// The language system used when no specific language is requested.
    pub default_lang_sys: Option<LangSys>,
    /// Language systems by tag. They are written sorted by tag.
    pub lang_systems: Vec<(Tag, LangSys)>,
}

/// The features a language system uses.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct LangSys {
    /// The index of a feature that is always applied.
    pub required_feature: Option<u16>,
    /// Indices into [`LayoutTable::features`].
    pub features: Vec<u16>,
}

/// A feature and its lookups.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Feature {
    /// The feature tag, e.g. `liga`.
    pub tag: Tag,
    /// Indices into [`LayoutTable::lookups`]. Repeated indices are written
    /// once.
    pub lookups: Vec<u16>,
    /// Encoded FeatureParams, e.g. for `size` or `ssXX` features. They are
    /// written right after the lookup indices.
    pub params: Option<Vec<u8>>,
}

/// A lookup with encoded subtables.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Lookup {
    /// The lookup type.
    pub kind: u16,
    /// The lookup flags. The mark filtering set bit is derived from
    /// `mark_filtering_set` when the lookup is written.
    pub flag: u16,
    /// The mark glyph set in GDEF that filters the marks this lookup skips.
    pub mark_filtering_set: Option<u16>,
    /// The encoded subtables, each relative to its own start.
    pub subtables: Vec<Vec<u8>>,
}

impl LayoutTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a lookup and return its index.
    pub fn push_lookup(&mut self, lookup: Lookup) -> usize {
        self.lookups.push(lookup);
        self.lookups.len() - 1
    }

    /// Add a feature and return its index.
    pub fn push_feature(&mut self, tag: Tag, lookups: Vec<u16>) -> usize {
        self.features.push(Feature { tag, lookups, params: None });
        self.features.len() - 1
    }

    /// The script with the given tag, created with an empty default language
    /// system if it does not exist yet.
    pub fn script_mut(&mut self, tag: Tag) -> &mut Script {
        let index = match self.scripts.iter().position(|s| s.tag == tag) {
            Some(index) => index,
            None => {
                self.scripts.push(Script {
                    tag,
                    default_lang_sys: Some(LangSys::default()),
                    lang_systems: vec![],
                });
                self.scripts.len() - 1
            }
        };
        &mut self.scripts[index]
    }
}

impl Lookup {
    /// Create a lookup without flags.
    pub fn new(kind: u16, subtables: Vec<Vec<u8>>) -> Self {
        Self { kind, flag: 0, mark_filtering_set: None, subtables }
    }

    /// The flags as written, with the mark filtering set bit matching
    /// `mark_filtering_set`.
    pub fn effective_flag(&self) -> u16 {
        match self.mark_filtering_set {
            Some(_) => self.flag | USE_MARK_FILTERING_SET,
            None => self.flag & !USE_MARK_FILTERING_SET,
        }
    }
}

/// A glyph substitution table.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Gsub(pub LayoutTable);

/// A glyph positioning table.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Gpos(pub LayoutTable);

macro_rules! layout_table {
    ($ty:ident, $tag:expr, $extension:expr) => {
        impl Deref for $ty {
            type Target = LayoutTable;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl DerefMut for $ty {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl Table for $ty {
            const TAG: Tag = $tag;

            /// Layout tables of the base font are not decoded into builders.
            /// Use [`LayoutTableRef`] to inspect them.
            fn read(_: &Font) -> Option<Self> {
                None
            }

            fn write(&self) -> Result<Vec<u8>> {
                pack::pack(&self.0, Self::TAG, $extension)
            }

            builder_conversions!($ty);
        }
    };
}

layout_table!(Gsub, Tag::GSUB, GSUB_EXTENSION);
layout_table!(Gpos, Tag::GPOS, GPOS_EXTENSION);
