use crate::read::Reader;
use crate::table::{builder_conversions, Table};
use crate::write::Writer;
use crate::{Error, Font, Result, Tag};

/// The linear threshold table.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Ltsh {
    /// The pixel size from which on each glyph scales linearly.
    pub y_pels: Vec<u8>,
}

impl Ltsh {
    /// Parse the table from its bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut r = Reader::new(data);
        r.read::<u16>()?; // version
        let num_glyphs = r.read::<u16>()?;
        let y_pels = r.read_bytes(usize::from(num_glyphs))?.to_vec();
        Some(Ltsh { y_pels })
    }

    /// Resize to `num_glyphs` entries. New glyphs take the threshold of the
    /// last glyph.
    pub fn resize(&mut self, num_glyphs: u16) {
        let last = self.y_pels.last().copied().unwrap_or(1);
        self.y_pels.resize(usize::from(num_glyphs), last);
    }
}

impl Table for Ltsh {
    const TAG: Tag = Tag::LTSH;

    fn read(font: &Font) -> Option<Self> {
        Self::parse(font.table(Self::TAG)?)
    }

    fn write(&self) -> Result<Vec<u8>> {
        let num_glyphs = u16::try_from(self.y_pels.len()).map_err(|_| Error::Overflow {
            tag: Self::TAG,
            what: "number of glyphs".into(),
        })?;

        let mut w = Writer::with_capacity(4 + self.y_pels.len());
        w.write::<u16>(0);
        w.write::<u16>(num_glyphs);
        w.extend(&self.y_pels);
        Ok(w.finish())
    }

    builder_conversions!(Ltsh);
}
