use crate::read::Reader;
use crate::table::{builder_conversions, Table};
use crate::write::Writer;
use crate::{Font, Result, Tag};

/// The vertical header table. Versions 1.0 and 1.1 share the same layout.
#[derive(Debug, Clone, Eq, PartialEq)]
#[allow(missing_docs)]
pub struct Vhea {
    pub version: u32,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub advance_height_max: u16,
    pub min_top_side_bearing: i16,
    pub min_bottom_side_bearing: i16,
    pub y_max_extent: i16,
    pub caret_slope_rise: i16,
    pub caret_slope_run: i16,
    pub caret_offset: i16,
    pub metric_data_format: i16,
    /// The number of long metrics at the start of `vmtx`.
    pub num_of_long_ver_metrics: u16,
}

impl Vhea {
    /// Parse the table from its bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut r = Reader::new(data);
        let version = r.read::<u32>()?;
        if version != 0x00010000 && version != 0x00011000 {
            return None;
        }

        let ascender = r.read()?;
        let descender = r.read()?;
        let line_gap = r.read()?;
        let advance_height_max = r.read()?;
        let min_top_side_bearing = r.read()?;
        let min_bottom_side_bearing = r.read()?;
        let y_max_extent = r.read()?;
        let caret_slope_rise = r.read()?;
        let caret_slope_run = r.read()?;
        let caret_offset = r.read()?;
        r.skip_bytes(8)?;
        Some(Vhea {
            version,
            ascender,
            descender,
            line_gap,
            advance_height_max,
            min_top_side_bearing,
            min_bottom_side_bearing,
            y_max_extent,
            caret_slope_rise,
            caret_slope_run,
            caret_offset,
            metric_data_format: r.read()?,
            num_of_long_ver_metrics: r.read()?,
        })
    }
}

impl Table for Vhea {
    const TAG: Tag = Tag::VHEA;

    fn read(font: &Font) -> Option<Self> {
        Self::parse(font.table(Self::TAG)?)
    }

    fn write(&self) -> Result<Vec<u8>> {
        let mut w = Writer::with_capacity(36);
        w.write(self.version);
        w.write(self.ascender);
        w.write(self.descender);
        w.write(self.line_gap);
        w.write(self.advance_height_max);
        w.write(self.min_top_side_bearing);
        w.write(self.min_bottom_side_bearing);
        w.write(self.y_max_extent);
        w.write(self.caret_slope_rise);
        w.write(self.caret_slope_run);
        w.write(self.caret_offset);
        w.write::<[i16; 4]>([0; 4]);
        w.write(self.metric_data_format);
        w.write(self.num_of_long_ver_metrics);
        Ok(w.finish())
    }

    builder_conversions!(Vhea);
}
