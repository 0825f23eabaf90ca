//! The `head` table holds global information about the font. A commit only
//! ever touches `indexToLocFormat`, which depends on the size of the glyph
//! data. The checksum adjustment is recalculated in the very end.

use crate::read::Reader;
use crate::table::{builder_conversions, Table};
use crate::write::Writer;
use crate::{Font, Result, Tag};

/// The font header table.
#[derive(Debug, Clone, Eq, PartialEq)]
#[allow(missing_docs)]
pub struct Head {
    pub major_version: u16,
    pub minor_version: u16,
    pub font_revision: u32,
    pub checksum_adjustment: u32,
    pub magic_number: u32,
    pub flags: u16,
    pub units_per_em: u16,
    pub created: i64,
    pub modified: i64,
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
    pub mac_style: u16,
    pub lowest_rec_ppem: u16,
    pub font_direction_hint: i16,
    /// 0 for short `loca` offsets, 1 for long ones.
    pub index_to_loc_format: i16,
    pub glyph_data_format: i16,
}

impl Default for Head {
    fn default() -> Self {
        Self {
            major_version: 1,
            minor_version: 0,
            font_revision: 0x00010000,
            checksum_adjustment: 0,
            magic_number: 0x5F0F3CF5,
            flags: 0,
            units_per_em: 1000,
            created: 0,
            modified: 0,
            x_min: 0,
            y_min: 0,
            x_max: 0,
            y_max: 0,
            mac_style: 0,
            lowest_rec_ppem: 8,
            font_direction_hint: 2,
            index_to_loc_format: 0,
            glyph_data_format: 0,
        }
    }
}

impl Head {
    /// Parse the table from its bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut r = Reader::new(data);
        Some(Head {
            major_version: r.read()?,
            minor_version: r.read()?,
            font_revision: r.read()?,
            checksum_adjustment: r.read()?,
            magic_number: r.read()?,
            flags: r.read()?,
            units_per_em: r.read()?,
            created: r.read()?,
            modified: r.read()?,
            x_min: r.read()?,
            y_min: r.read()?,
            x_max: r.read()?,
            y_max: r.read()?,
            mac_style: r.read()?,
            lowest_rec_ppem: r.read()?,
            font_direction_hint: r.read()?,
            index_to_loc_format: r.read()?,
            glyph_data_format: r.read()?,
        })
    }
}

impl Table for Head {
    const TAG: Tag = Tag::HEAD;

    fn read(font: &Font) -> Option<Self> {
        Self::parse(font.table(Self::TAG)?)
    }

    fn write(&self) -> Result<Vec<u8>> {
        let mut w = Writer::with_capacity(54);
        w.write(self.major_version);
        w.write(self.minor_version);
        w.write(self.font_revision);
        w.write(self.checksum_adjustment);
        w.write(self.magic_number);
        w.write(self.flags);
        w.write(self.units_per_em);
        w.write(self.created);
        w.write(self.modified);
        w.write(self.x_min);
        w.write(self.y_min);
        w.write(self.x_max);
        w.write(self.y_max);
        w.write(self.mac_style);
        w.write(self.lowest_rec_ppem);
        w.write(self.font_direction_hint);
        w.write(self.index_to_loc_format);
        w.write(self.glyph_data_format);
        Ok(w.finish())
    }

    builder_conversions!(Head);
}
