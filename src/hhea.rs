use crate::read::Reader;
use crate::table::{builder_conversions, Table};
use crate::write::Writer;
use crate::{Font, Result, Tag};

/// The horizontal header table.
#[derive(Debug, Clone, Eq, PartialEq)]
#[allow(missing_docs)]
pub struct Hhea {
    pub version: u32,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub advance_width_max: u16,
    pub min_left_side_bearing: i16,
    pub min_right_side_bearing: i16,
    pub x_max_extent: i16,
    pub caret_slope_rise: i16,
    pub caret_slope_run: i16,
    pub caret_offset: i16,
    pub metric_data_format: i16,
    /// The number of long metrics at the start of `hmtx`.
    pub number_of_h_metrics: u16,
}

impl Hhea {
    /// Parse the table from its bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut r = Reader::new(data);
        let version = r.read()?;
        let ascender = r.read()?;
        let descender = r.read()?;
        let line_gap = r.read()?;
        let advance_width_max = r.read()?;
        let min_left_side_bearing = r.read()?;
        let min_right_side_bearing = r.read()?;
        let x_max_extent = r.read()?;
        let caret_slope_rise = r.read()?;
        let caret_slope_run = r.read()?;
        let caret_offset = r.read()?;
        r.skip_bytes(8)?; // reserved
        Some(Hhea {
            version,
            ascender,
            descender,
            line_gap,
            advance_width_max,
            min_left_side_bearing,
            min_right_side_bearing,
            x_max_extent,
            caret_slope_rise,
            caret_slope_run,
            caret_offset,
            metric_data_format: r.read()?,
            number_of_h_metrics: r.read()?,
        })
    }
}

impl Table for Hhea {
    const TAG: Tag = Tag::HHEA;

    fn read(font: &Font) -> Option<Self> {
        Self::parse(font.table(Self::TAG)?)
    }

    fn write(&self) -> Result<Vec<u8>> {
        let mut w = Writer::with_capacity(36);
        w.write(self.version);
        w.write(self.ascender);
        w.write(self.descender);
        w.write(self.line_gap);
        w.write(self.advance_width_max);
        w.write(self.min_left_side_bearing);
        w.write(self.min_right_side_bearing);
        w.write(self.x_max_extent);
        w.write(self.caret_slope_rise);
        w.write(self.caret_slope_run);
        w.write(self.caret_offset);
        w.write::<[i16; 4]>([0; 4]);
        w.write(self.metric_data_format);
        w.write(self.number_of_h_metrics);
        Ok(w.finish())
    }

    builder_conversions!(Hhea);
}
