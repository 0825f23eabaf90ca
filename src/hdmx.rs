//! The `hdmx` table stores integer advance widths for a number of pixel sizes.
//! Each device record has one width per glyph, so the table follows the glyph
//! count of the font.

use crate::maxp::Maxp;
use crate::read::Reader;
use crate::table::{builder_conversions, Table};
use crate::write::Writer;
use crate::{Error, Font, Result, Tag};

/// The horizontal device metrics table.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Hdmx {
    /// The device records, sorted by pixel size.
    pub records: Vec<DeviceRecord>,
}

/// The widths of all glyphs at one pixel size.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct DeviceRecord {
    /// The pixel size.
    pub pixel_size: u8,
    /// The largest of the widths.
    pub max_width: u8,
    /// One width per glyph.
    pub widths: Vec<u8>,
}

impl Hdmx {
    /// Parse the table given `maxp.numGlyphs`.
    pub fn parse(data: &[u8], num_glyphs: u16) -> Option<Self> {
        let mut r = Reader::new(data);
        r.read::<u16>()?; // version
        let count = usize::try_from(r.read::<i16>()?).ok()?;
        let size = usize::try_from(r.read::<i32>()?).ok()?;
        if size < 2 + usize::from(num_glyphs) {
            return None;
        }

        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            let mut record = Reader::new(r.read_bytes(size)?);
            records.push(DeviceRecord {
                pixel_size: record.read()?,
                max_width: record.read()?,
                widths: record.read_bytes(usize::from(num_glyphs))?.to_vec(),
            });
        }

        Some(Hdmx { records })
    }

    /// The number of glyphs the records cover, or `None` if they disagree.
    pub fn num_glyphs(&self) -> Option<usize> {
        let first = self.records.first().map_or(0, |record| record.widths.len());
        self.records
            .iter()
            .all(|record| record.widths.len() == first)
            .then_some(first)
    }

    /// Resize all records to `num_glyphs` widths. New glyphs take the width
    /// of the last glyph.
    pub fn resize(&mut self, num_glyphs: u16) {
        for record in &mut self.records {
            let last = record.widths.last().copied().unwrap_or(0);
            record.widths.resize(usize::from(num_glyphs), last);
            record.max_width = record.widths.iter().copied().max().unwrap_or(0);
        }
    }
}

impl Table for Hdmx {
    const TAG: Tag = Tag::HDMX;

    fn read(font: &Font) -> Option<Self> {
        let maxp = Maxp::read(font)?;
        Self::parse(font.table(Self::TAG)?, maxp.num_glyphs)
    }

    fn write(&self) -> Result<Vec<u8>> {
        let overflow = |what: &str| Error::Overflow { tag: Self::TAG, what: what.into() };
        let num_glyphs = self.num_glyphs().ok_or_else(|| Error::Inconsistent {
            tag: Self::TAG,
            reason: "device records have different glyph counts".into(),
        })?;

        // Records are padded to a multiple of four bytes.
        let size = (2 + num_glyphs + 3) & !3;
        let count = i16::try_from(self.records.len()).map_err(|_| overflow("record count"))?;

        let mut w = Writer::with_capacity(8 + self.records.len() * size);
        w.write::<u16>(0);
        w.write::<i16>(count);
        w.write::<i32>(i32::try_from(size).map_err(|_| overflow("record size"))?);
        for record in &self.records {
            w.write(record.pixel_size);
            w.write(record.max_width);
            w.extend(&record.widths);
            w.align(4);
        }

        Ok(w.finish())
    }

    builder_conversions!(Hdmx);
}
