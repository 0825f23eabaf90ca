//! Reading the table directory of a font file or font collection.
//!
//! Nothing here copies table data: a [`Font`] only keeps the records of its
//! table directory and hands out slices of the original buffer.

use crate::read::Reader;
use crate::write::{Writeable, Writer};
use crate::{Error, Result, TableRecord, Tag};
use log::warn;
use rustc_hash::FxHashSet;

/// What kind of contents the font has.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FontKind {
    /// TrueType outlines.
    TrueType,
    /// CFF outlines
    Cff,
    /// A font collection.
    Collection,
}

impl FontKind {
    fn from_u32(version: u32) -> Option<Self> {
        match version {
            0x00010000 | 0x74727565 => Some(FontKind::TrueType),
            0x4F54544F => Some(FontKind::Cff),
            0x74746366 => Some(FontKind::Collection),
            _ => None,
        }
    }
}

impl Writeable for FontKind {
    fn write(&self, w: &mut Writer) {
        w.write::<u32>(match self {
            FontKind::TrueType => 0x00010000,
            FontKind::Cff => 0x4F54544F,
            FontKind::Collection => 0x74746366,
        })
    }
}

/// An immutable view of one table inside the font file.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TableSlice<'a> {
    tag: Tag,
    data: &'a [u8],
}

impl<'a> TableSlice<'a> {
    /// The table's tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// The table's bytes, without padding.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

/// A font face with OpenType tables.
#[derive(Debug, Clone)]
pub struct Font<'a> {
    data: &'a [u8],
    kind: FontKind,
    version: u32,
    records: Vec<TableRecord>,
}

impl<'a> Font<'a> {
    /// Parse a font face from OpenType data.
    ///
    /// The `index` is only relevant if the data contains a font collection
    /// (`.ttc` or `.otc` file). Otherwise, it should be 0.
    pub fn new(data: &'a [u8], index: u32) -> Result<Self> {
        let version = Reader::new(data).read::<u32>().ok_or(Error::MalformedFont)?;
        match FontKind::from_u32(version) {
            Some(FontKind::Collection) => Collection::parse(data)?.font(index),
            Some(_) => Self::at(data, 0),
            None => Err(Error::UnknownKind),
        }
    }

    /// Parse the offset table starting at `offset`.
    fn at(data: &'a [u8], offset: usize) -> Result<Self> {
        let mut r = Reader::new_at(data, offset);
        let version = r.read::<u32>().ok_or(Error::MalformedFont)?;
        let kind = match FontKind::from_u32(version) {
            Some(FontKind::Collection) | None => return Err(Error::UnknownKind),
            Some(kind) => kind,
        };

        // Read number of table records and skip the search parameters.
        let count = r.read::<u16>().ok_or(Error::MalformedFont)?;
        r.skip_bytes(6).ok_or(Error::MalformedFont)?;

        let mut records = r
            .read_vector::<TableRecord>(usize::from(count))
            .ok_or(Error::MalformedFont)?;

        // Directories should be sorted already, but lookups rely on it.
        records.sort_by_key(|record| record.tag);
        records.dedup_by_key(|record| record.tag);

        Ok(Font { data, kind, version, records })
    }

    /// The whole file this font was read from.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The kind of outlines the font has.
    pub fn kind(&self) -> FontKind {
        self.kind
    }

    /// The raw sfnt version number of the font.
    pub fn sfnt_version(&self) -> u32 {
        self.version
    }

    /// The table records, sorted by tag.
    pub fn records(&self) -> &[TableRecord] {
        &self.records
    }

    /// The tags of all tables in the font, in ascending order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.records.iter().map(|record| record.tag)
    }

    /// Whether the font has a table with this tag.
    pub fn contains(&self, tag: Tag) -> bool {
        self.record(tag).is_some()
    }

    /// The record of a table.
    pub fn record(&self, tag: Tag) -> Option<&TableRecord> {
        let i = self.records.binary_search_by(|record| record.tag.cmp(&tag)).ok()?;
        self.records.get(i)
    }

    /// The data of a table.
    ///
    /// Returns `None` if the table is missing or its record points outside
    /// of the file.
    pub fn table(&self, tag: Tag) -> Option<&'a [u8]> {
        let record = self.record(tag)?;
        let start = record.offset as usize;
        let end = start.checked_add(record.length as usize)?;
        let data = self.data.get(start..end);
        if data.is_none() {
            warn!("{tag} table record points outside of the file");
        }
        data
    }

    /// A table as a [`TableSlice`].
    pub fn slice(&self, tag: Tag) -> Option<TableSlice<'a>> {
        self.table(tag).map(|data| TableSlice { tag, data })
    }
}

/// A font collection (`.ttc` or `.otc` file).
///
/// Collections can only be read. Member fonts may share tables, which
/// [`Collection::shared_tables`] reports only once.
#[derive(Debug, Clone)]
pub struct Collection<'a> {
    data: &'a [u8],
    major_version: u16,
    offsets: Vec<u32>,
}

impl<'a> Collection<'a> {
    /// Parse the header of a font collection.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let tag = r.read::<Tag>().ok_or(Error::MalformedFont)?;
        if tag != Tag(*b"ttcf") {
            return Err(Error::UnknownKind);
        }

        let major_version = r.read::<u16>().ok_or(Error::MalformedFont)?;
        r.skip::<u16>().ok_or(Error::MalformedFont)?; // minor version
        let count = r.read::<u32>().ok_or(Error::MalformedFont)?;
        let offsets = r
            .read_vector::<u32>(count as usize)
            .ok_or(Error::MalformedFont)?;

        Ok(Collection { data, major_version, offsets })
    }

    /// The major version of the collection header.
    pub fn major_version(&self) -> u16 {
        self.major_version
    }

    /// The number of fonts in the collection.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether the collection has no fonts.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Read the font at `index`.
    pub fn font(&self, index: u32) -> Result<Font<'a>> {
        let offset = self.offsets.get(index as usize).ok_or(Error::MalformedFont)?;
        Font::at(self.data, *offset as usize)
    }

    /// All fonts of the collection. Fonts that cannot be read are skipped.
    pub fn fonts(&self) -> impl Iterator<Item = Font<'a>> + '_ {
        (0..self.offsets.len() as u32).filter_map(|i| match self.font(i) {
            Ok(font) => Some(font),
            Err(err) => {
                warn!("skipping font {i} in collection: {err}");
                None
            }
        })
    }

    /// The table records of all member fonts, where tables shared between
    /// fonts (same tag at the same offset) are reported once, in order of
    /// first appearance.
    pub fn shared_tables(&self) -> Vec<TableRecord> {
        let mut seen = FxHashSet::default();
        let mut records = vec![];
        for font in self.fonts() {
            for record in font.records() {
                if seen.insert((record.tag, record.offset)) {
                    records.push(*record);
                }
            }
        }
        records
    }
}
