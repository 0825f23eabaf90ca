//! The `cmap` table maps characters to glyphs. Formats 4, 12 and 14 are
//! decoded into mappings so that they can be edited and checked against the
//! glyph count of the font. All other formats are kept as opaque bytes.

mod format12;
mod format14;
mod format4;

pub use self::format12::Format12;
pub use self::format14::{Format14, VariationSelector};
pub use self::format4::Format4;

use crate::read::{read_at, Readable, Reader};
use crate::table::{builder_conversions, Table};
use crate::write::{Writeable, Writer};
use crate::{Error, Font, Result, Tag};
use log::warn;
use rustc_hash::FxHashMap;

/// The character to glyph index mapping table.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Cmap {
    /// The encoding records with their subtables.
    pub records: Vec<EncodingRecord>,
}

/// A subtable for one platform and encoding.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EncodingRecord {
    /// The platform id.
    pub platform_id: u16,
    /// The platform-specific encoding id.
    pub encoding_id: u16,
    /// The subtable.
    pub subtable: CmapSubtable,
}

impl EncodingRecord {
    /// Whether the record maps Unicode code points.
    pub fn is_unicode(&self) -> bool {
        self.platform_id == 0
            || (self.platform_id == 3 && [0, 1, 10].contains(&self.encoding_id))
    }
}

/// A `cmap` subtable.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CmapSubtable {
    /// Segment mapping to delta values.
    Format4(Format4),
    /// Segmented coverage.
    Format12(Format12),
    /// Unicode variation sequences.
    Format14(Format14),
    /// Any other format, kept as it is.
    Raw(Vec<u8>),
}

impl CmapSubtable {
    fn parse(data: &[u8]) -> Option<Self> {
        let format = read_at::<u16>(data, 0)?;
        let len = match format {
            0 | 2 | 4 | 6 => usize::from(read_at::<u16>(data, 2)?),
            8 | 10 | 12 | 13 => read_at::<u32>(data, 4)? as usize,
            14 => read_at::<u32>(data, 2)? as usize,
            _ => return None,
        };

        // Some fonts have a wrong length in format 4 subtables, so those are
        // only bounded by the table.
        let data = match format {
            4 => data,
            _ => data.get(..len)?,
        };

        Some(match format {
            4 => CmapSubtable::Format4(Format4::parse(data)?),
            12 => CmapSubtable::Format12(Format12::parse(data)?),
            14 => CmapSubtable::Format14(Format14::parse(data)?),
            _ => CmapSubtable::Raw(data.to_vec()),
        })
    }

    fn write(&self) -> Result<Vec<u8>> {
        match self {
            CmapSubtable::Format4(table) => table.write(),
            CmapSubtable::Format12(table) => table.write(),
            CmapSubtable::Format14(table) => table.write(),
            CmapSubtable::Raw(data) => Ok(data.clone()),
        }
    }
}

struct RecordHeader {
    platform_id: u16,
    encoding_id: u16,
    subtable_offset: u32,
}

impl Readable<'_> for RecordHeader {
    const SIZE: usize = 8;

    fn read(r: &mut Reader) -> Option<Self> {
        let platform_id = r.read::<u16>()?;
        let encoding_id = r.read::<u16>()?;
        let subtable_offset = r.read::<u32>()?;

        Some(RecordHeader { platform_id, encoding_id, subtable_offset })
    }
}

impl Writeable for RecordHeader {
    fn write(&self, w: &mut Writer) {
        w.write::<u16>(self.platform_id);
        w.write::<u16>(self.encoding_id);
        w.write::<u32>(self.subtable_offset);
    }
}

impl Cmap {
    /// Parse the table from its bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut r = Reader::new(data);
        r.read::<u16>()?; // version
        let num_tables = r.read::<u16>()?;

        let mut records = vec![];
        for header in r.read_vector::<RecordHeader>(usize::from(num_tables))? {
            let subtable_data = data.get(header.subtable_offset as usize..)?;
            let Some(subtable) = CmapSubtable::parse(subtable_data) else {
                warn!(
                    "malformed cmap subtable for platform {} encoding {}",
                    header.platform_id, header.encoding_id
                );
                return None;
            };

            records.push(EncodingRecord {
                platform_id: header.platform_id,
                encoding_id: header.encoding_id,
                subtable,
            });
        }

        Some(Cmap { records })
    }

    /// Look up the glyph of a code point in the Unicode subtables.
    pub fn glyph_index(&self, code_point: u32) -> Option<u16> {
        self.records.iter().filter(|r| r.is_unicode()).find_map(|r| match &r.subtable {
            CmapSubtable::Format4(table) => {
                table.mappings.get(&u16::try_from(code_point).ok()?).copied()
            }
            CmapSubtable::Format12(table) => table.mappings.get(&code_point).copied(),
            _ => None,
        })
    }

    /// Map a code point to a glyph in all Unicode subtables that can hold
    /// it.
    pub fn insert(&mut self, code_point: u32, glyph_id: u16) {
        for record in self.records.iter_mut().filter(|r| r.is_unicode()) {
            match &mut record.subtable {
                CmapSubtable::Format4(table) => {
                    if let Ok(c) = u16::try_from(code_point) {
                        table.mappings.insert(c, glyph_id);
                    }
                }
                CmapSubtable::Format12(table) => {
                    table.mappings.insert(code_point, glyph_id);
                }
                _ => {}
            }
        }
    }

    /// Remove a code point from all decoded subtables, including the
    /// variation sequences based on it.
    pub fn remove(&mut self, code_point: u32) {
        for record in &mut self.records {
            match &mut record.subtable {
                CmapSubtable::Format4(table) => {
                    if let Ok(c) = u16::try_from(code_point) {
                        table.mappings.remove(&c);
                    }
                }
                CmapSubtable::Format12(table) => {
                    table.mappings.remove(&code_point);
                }
                CmapSubtable::Format14(table) => {
                    for selector in &mut table.selectors {
                        selector.non_default_uvs.retain(|&(c, _)| c != code_point);
                    }
                }
                CmapSubtable::Raw(_) => {}
            }
        }
    }

    /// Find a mapping to a glyph id that is not below `num_glyphs`. Returns
    /// the code point, the glyph id and, for variation sequences, the
    /// variation selector.
    ///
    /// Opaque subtables are not checked.
    pub fn find_glyph_at_or_above(&self, num_glyphs: u16) -> Option<(u32, u16, Option<u32>)> {
        for record in &self.records {
            let found = match &record.subtable {
                CmapSubtable::Format4(table) => table
                    .mappings
                    .iter()
                    .find(|(_, &g)| g >= num_glyphs)
                    .map(|(&c, &g)| (u32::from(c), g, None)),
                CmapSubtable::Format12(table) => table
                    .mappings
                    .iter()
                    .find(|(_, &g)| g >= num_glyphs)
                    .map(|(&c, &g)| (c, g, None)),
                CmapSubtable::Format14(table) => {
                    table.selectors.iter().find_map(|selector| {
                        selector
                            .non_default_uvs
                            .iter()
                            .find(|(_, g)| *g >= num_glyphs)
                            .map(|&(c, g)| (c, g, Some(selector.var_selector)))
                    })
                }
                CmapSubtable::Raw(_) => None,
            };

            if found.is_some() {
                return found;
            }
        }

        None
    }
}

impl Table for Cmap {
    const TAG: Tag = Tag::CMAP;

    fn read(font: &Font) -> Option<Self> {
        Self::parse(font.table(Self::TAG)?)
    }

    fn write(&self) -> Result<Vec<u8>> {
        let mut records = self.records.iter().collect::<Vec<_>>();
        records.sort_by_key(|r| (r.platform_id, r.encoding_id));

        let num_tables = u16::try_from(records.len()).map_err(|_| Error::Overflow {
            tag: Self::TAG,
            what: "number of encoding records".into(),
        })?;

        let mut sub_cmap = Writer::new();
        let mut subtables = Writer::new();
        let mut offsets = FxHashMap::default();
        let start = 4 + records.len() * RecordHeader::SIZE;

        sub_cmap.write::<u16>(0);
        sub_cmap.write::<u16>(num_tables);

        for record in records {
            let data = record.subtable.write()?;
            // Identical subtables are shared between records.
            let offset = match offsets.get(&data) {
                Some(&offset) => offset,
                None => {
                    let offset = u32::try_from(start + subtables.len()).map_err(|_| {
                        Error::Overflow { tag: Self::TAG, what: "subtable offset".into() }
                    })?;
                    subtables.extend(&data);
                    offsets.insert(data, offset);
                    offset
                }
            };

            sub_cmap.write(RecordHeader {
                platform_id: record.platform_id,
                encoding_id: record.encoding_id,
                subtable_offset: offset,
            });
        }

        sub_cmap.extend(&subtables.finish());
        Ok(sub_cmap.finish())
    }

    builder_conversions!(Cmap);
}
