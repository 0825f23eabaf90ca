//! The `loca` table is fully derived from `glyf`. Whenever the glyph data is
//! edited, it is rebuilt from scratch and the smallest format that can
//! address the glyph data is chosen again.

use crate::glyf::{padded_len, Glyf};
use crate::head::Head;
use crate::maxp::Maxp;
use crate::read::Reader;
use crate::table::{builder_conversions, Table};
use crate::write::Writer;
use crate::{Error, Font, Result, Tag};

/// The largest glyph data length that short offsets can address.
pub const MAX_SHORT_GLYF_LEN: usize = 2 * u16::MAX as usize;

/// The index to location table.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Loca {
    offsets: Vec<u32>,
}

impl Loca {
    /// Create a table from `numGlyphs + 1` offsets into `glyf`.
    pub fn new(offsets: Vec<u32>) -> Self {
        Self { offsets }
    }

    /// Build the offsets for glyph data laid out by [`Glyf`].
    pub fn from_glyf(glyf: &Glyf) -> Result<Self> {
        let mut offsets = Vec::with_capacity(glyf.len() + 1);
        let mut offset = 0usize;
        offsets.push(0);
        for glyph in glyf.glyphs() {
            offset += padded_len(glyph.len());
            offsets.push(u32::try_from(offset).map_err(|_| Error::Overflow {
                tag: Tag::LOCA,
                what: "glyph offset".into(),
            })?);
        }
        Ok(Self { offsets })
    }

    /// Parse the table given the `head.indexToLocFormat` and
    /// `maxp.numGlyphs` it belongs to.
    pub fn parse(data: &[u8], index_to_loc_format: i16, num_glyphs: u16) -> Option<Self> {
        let count = usize::from(num_glyphs) + 1;
        let mut r = Reader::new(data);
        let offsets = match index_to_loc_format {
            0 => r
                .read_vector::<u16>(count)?
                .into_iter()
                .map(|half| u32::from(half) * 2)
                .collect::<Vec<_>>(),
            1 => r.read_vector::<u32>(count)?,
            _ => return None,
        };

        // Offsets must not decrease.
        if offsets.windows(2).any(|pair| pair[0] > pair[1]) {
            return None;
        }

        Some(Self { offsets })
    }

    /// The offsets, one more than there are glyphs.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// The value `head.indexToLocFormat` must have for this table: 0 if all
    /// offsets fit the short format, 1 otherwise.
    pub fn format(&self) -> i16 {
        let last = self.offsets.last().copied().unwrap_or(0) as usize;
        let short = last <= MAX_SHORT_GLYF_LEN
            && self.offsets.iter().all(|&offset| offset % 2 == 0);
        if short {
            0
        } else {
            1
        }
    }
}

impl Table for Loca {
    const TAG: Tag = Tag::LOCA;

    fn read(font: &Font) -> Option<Self> {
        let head = Head::read(font)?;
        let maxp = Maxp::read(font)?;
        Self::parse(font.table(Self::TAG)?, head.index_to_loc_format, maxp.num_glyphs)
    }

    fn write(&self) -> Result<Vec<u8>> {
        let short = self.format() == 0;
        let mut w = Writer::with_capacity(self.offsets.len() * if short { 2 } else { 4 });
        for &offset in &self.offsets {
            if short {
                w.write::<u16>((offset / 2) as u16);
            } else {
                w.write::<u32>(offset);
            }
        }
        Ok(w.finish())
    }

    builder_conversions!(Loca);
}
