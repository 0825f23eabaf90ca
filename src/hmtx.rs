//! The `hmtx` and `vmtx` tables store one advance and side bearing per glyph.
//! Glyphs at the end of the font that share the advance of the last long
//! metric only store their side bearing. Both tables are kept expanded to one
//! [`Metric`] per glyph while editing and are compacted again on write.

use crate::hhea::Hhea;
use crate::maxp::Maxp;
use crate::read::Reader;
use crate::table::{builder_conversions, Table};
use crate::vhea::Vhea;
use crate::write::Writer;
use crate::{Font, Result, Tag};
use log::warn;

/// The metrics of one glyph.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Metric {
    /// The advance width or height.
    pub advance: u16,
    /// The left or top side bearing.
    pub side_bearing: i16,
}

/// The horizontal metrics table.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Hmtx {
    /// One metric per glyph.
    pub metrics: Vec<Metric>,
}

/// The vertical metrics table.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Vmtx {
    /// One metric per glyph.
    pub metrics: Vec<Metric>,
}

impl Hmtx {
    /// Parse the table given `hhea.numberOfHMetrics` and `maxp.numGlyphs`.
    pub fn parse(data: &[u8], number_of_h_metrics: u16, num_glyphs: u16) -> Option<Self> {
        parse_metrics(data, number_of_h_metrics, num_glyphs).map(|metrics| Self { metrics })
    }

    /// The number of long metrics the compacted table has. This is the value
    /// for `hhea.numberOfHMetrics`.
    pub fn long_metrics(&self) -> u16 {
        long_metrics(&self.metrics)
    }

    /// Resize to `num_glyphs` metrics. New glyphs take the advance of the
    /// last glyph and a zero side bearing.
    pub fn resize(&mut self, num_glyphs: u16) {
        resize(&mut self.metrics, num_glyphs)
    }

    /// The largest advance width.
    pub fn max_advance(&self) -> u16 {
        self.metrics.iter().map(|m| m.advance).max().unwrap_or(0)
    }

    /// The mean advance width over all glyphs, truncated towards zero.
    pub fn average_advance(&self) -> i16 {
        if self.metrics.is_empty() {
            return 0;
        }

        let sum: u64 = self.metrics.iter().map(|m| u64::from(m.advance)).sum();
        let avg = sum / self.metrics.len() as u64;
        i16::try_from(avg).unwrap_or(i16::MAX)
    }
}

impl Vmtx {
    /// Parse the table given `vhea.numOfLongVerMetrics` and `maxp.numGlyphs`.
    pub fn parse(
        data: &[u8],
        num_of_long_ver_metrics: u16,
        num_glyphs: u16,
    ) -> Option<Self> {
        parse_metrics(data, num_of_long_ver_metrics, num_glyphs)
            .map(|metrics| Self { metrics })
    }

    /// The number of long metrics the compacted table has. This is the value
    /// for `vhea.numOfLongVerMetrics`.
    pub fn long_metrics(&self) -> u16 {
        long_metrics(&self.metrics)
    }

    /// Resize to `num_glyphs` metrics, like [`Hmtx::resize`].
    pub fn resize(&mut self, num_glyphs: u16) {
        resize(&mut self.metrics, num_glyphs)
    }

    /// The largest advance height.
    pub fn max_advance(&self) -> u16 {
        self.metrics.iter().map(|m| m.advance).max().unwrap_or(0)
    }
}

impl Table for Hmtx {
    const TAG: Tag = Tag::HMTX;

    fn read(font: &Font) -> Option<Self> {
        let hhea = Hhea::read(font)?;
        let maxp = Maxp::read(font)?;
        let data = font.table(Self::TAG)?;
        let hmtx = Self::parse(data, hhea.number_of_h_metrics, maxp.num_glyphs);
        if hmtx.is_none() {
            warn!("hmtx table does not match hhea and maxp");
        }
        hmtx
    }

    fn write(&self) -> Result<Vec<u8>> {
        Ok(write_metrics(&self.metrics))
    }

    builder_conversions!(Hmtx);
}

impl Table for Vmtx {
    const TAG: Tag = Tag::VMTX;

    fn read(font: &Font) -> Option<Self> {
        let vhea = Vhea::read(font)?;
        let maxp = Maxp::read(font)?;
        let data = font.table(Self::TAG)?;
        let vmtx = Self::parse(data, vhea.num_of_long_ver_metrics, maxp.num_glyphs);
        if vmtx.is_none() {
            warn!("vmtx table does not match vhea and maxp");
        }
        vmtx
    }

    fn write(&self) -> Result<Vec<u8>> {
        Ok(write_metrics(&self.metrics))
    }

    builder_conversions!(Vmtx);
}

fn parse_metrics(data: &[u8], long: u16, num_glyphs: u16) -> Option<Vec<Metric>> {
    if long == 0 && num_glyphs > 0 {
        return None;
    }

    let long = long.min(num_glyphs);
    let mut r = Reader::new(data);
    let mut metrics = Vec::with_capacity(usize::from(num_glyphs));
    for _ in 0..long {
        let advance = r.read::<u16>()?;
        let side_bearing = r.read::<i16>()?;
        metrics.push(Metric { advance, side_bearing });
    }

    let advance = metrics.last().map_or(0, |m| m.advance);
    for _ in long..num_glyphs {
        // Some fonts leave out trailing side bearings.
        let side_bearing = r.read::<i16>().unwrap_or(0);
        metrics.push(Metric { advance, side_bearing });
    }

    Some(metrics)
}

fn long_metrics(metrics: &[Metric]) -> u16 {
    let mut n = metrics.len();
    while n > 1 && metrics[n - 2].advance == metrics[n - 1].advance {
        n -= 1;
    }
    n as u16
}

fn resize(metrics: &mut Vec<Metric>, num_glyphs: u16) {
    let advance = metrics.last().map_or(0, |m| m.advance);
    metrics.resize(usize::from(num_glyphs), Metric { advance, side_bearing: 0 });
}

fn write_metrics(metrics: &[Metric]) -> Vec<u8> {
    let long = usize::from(long_metrics(metrics));
    let mut w = Writer::with_capacity(long * 4 + (metrics.len() - long) * 2);
    for (i, metric) in metrics.iter().enumerate() {
        if i < long {
            w.write::<u16>(metric.advance);
        }
        w.write::<i16>(metric.side_bearing);
    }
    w.finish()
}
