//! Only `xAvgCharWidth` of the `OS/2` table takes part in commits. All other
//! fields are kept as they are.

use crate::read::Reader;
use crate::table::{builder_conversions, Table};
use crate::write::Writer;
use crate::{Font, Result, Tag};

/// The OS/2 and Windows metrics table.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Os2 {
    /// The table version.
    pub version: u16,
    /// The average advance width of the glyphs in the font.
    pub x_avg_char_width: i16,
    /// Everything after `xAvgCharWidth`.
    pub rest: Vec<u8>,
}

impl Os2 {
    /// Parse the table from its bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        // Version 0 is the shortest version of the table.
        if data.len() < 78 {
            return None;
        }

        let mut r = Reader::new(data);
        Some(Os2 {
            version: r.read()?,
            x_avg_char_width: r.read()?,
            rest: r.tail()?.to_vec(),
        })
    }
}

impl Table for Os2 {
    const TAG: Tag = Tag::OS2;

    fn read(font: &Font) -> Option<Self> {
        Self::parse(font.table(Self::TAG)?)
    }

    fn write(&self) -> Result<Vec<u8>> {
        let mut w = Writer::with_capacity(4 + self.rest.len());
        w.write(self.version);
        w.write(self.x_avg_char_width);
        w.extend(&self.rest);
        Ok(w.finish())
    }

    builder_conversions!(Os2);
}
