//! The `post` table contains name information for glyphs needed for some
//! PostScript printers. Only version 2.0 tables store a name per glyph, so
//! this is the only version whose glyph count has to agree with `maxp`.
//! Other versions are kept as they are.

use crate::read::{LazyArray16, Reader};
use crate::table::{builder_conversions, Table};
use crate::write::Writer;
use crate::{Error, Font, Result, Tag};

const VERSION_2_0: u32 = 0x00020000;

/// Glyph name indices below this number refer to the standard Macintosh names.
pub const STANDARD_NAMES: u16 = 258;

/// The PostScript table.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Post {
    /// The fixed header: version, italic angle, underline metrics, pitch and
    /// memory usage.
    pub header: [u8; 32],
    /// The glyph names of a version 2.0 table.
    pub glyph_names: Option<GlyphNames>,
    /// Data following the header in other versions, kept opaque.
    pub rest: Vec<u8>,
}

/// The glyph names of a version 2.0 `post` table.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct GlyphNames {
    /// One name index per glyph. Indices below 258 refer to the standard
    /// Macintosh names, the others into `names`.
    pub indices: Vec<u16>,
    /// The custom names, as Pascal strings without their length byte.
    pub names: Vec<Vec<u8>>,
}

impl GlyphNames {
    /// Give the next glyph a custom name.
    pub fn push(&mut self, name: &[u8]) {
        let index = STANDARD_NAMES as usize + self.names.len();
        self.indices.push(index as u16);
        self.names.push(name.to_vec());
    }

    /// The custom name of a glyph, if it has one.
    pub fn get(&self, glyph_id: u16) -> Option<&[u8]> {
        let index = *self.indices.get(usize::from(glyph_id))?;
        let index = index.checked_sub(STANDARD_NAMES)?;
        self.names.get(usize::from(index)).map(Vec::as_slice)
    }
}

impl Post {
    /// Parse the table from its bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut r = Reader::new(data);
        let header = r.read::<[u8; 32]>()?;
        let version = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        if version != VERSION_2_0 {
            return Some(Post { header, glyph_names: None, rest: r.tail()?.to_vec() });
        }

        let count = r.read::<u16>()?;
        let indices: LazyArray16<u16> = r.read_array16(count)?;
        let names = Names { data: r.tail()?, offset: 0 }.map(<[u8]>::to_vec).collect();
        Some(Post {
            header,
            glyph_names: Some(GlyphNames { indices: indices.into_iter().collect(), names }),
            rest: vec![],
        })
    }

    /// The table version, e.g. `0x00020000` for version 2.0.
    pub fn version(&self) -> u32 {
        let h = &self.header;
        u32::from_be_bytes([h[0], h[1], h[2], h[3]])
    }

    /// Turn the table into a version 3.0 table without glyph names.
    pub fn drop_glyph_names(&mut self) {
        self.header[0..4].copy_from_slice(&0x00030000u32.to_be_bytes());
        self.glyph_names = None;
        self.rest.clear();
    }
}

impl Table for Post {
    const TAG: Tag = Tag::POST;

    fn read(font: &Font) -> Option<Self> {
        Self::parse(font.table(Self::TAG)?)
    }

    fn write(&self) -> Result<Vec<u8>> {
        let mut w = Writer::new();
        w.write(self.header);
        let Some(glyph_names) = &self.glyph_names else {
            w.extend(&self.rest);
            return Ok(w.finish());
        };

        let overflow = |what: &str| Error::Overflow { tag: Self::TAG, what: what.into() };
        let count = u16::try_from(glyph_names.indices.len())
            .map_err(|_| overflow("number of glyphs"))?;
        w.write(count);
        w.write(glyph_names.indices.as_slice());
        for name in &glyph_names.names {
            let len = u8::try_from(name.len()).map_err(|_| overflow("glyph name length"))?;
            w.write(len);
            w.extend(name);
        }

        Ok(w.finish())
    }

    builder_conversions!(Post);
}

/// An iterator over glyph names.
///
/// The `post` table doesn't provide the glyph names count,
/// so we have to simply iterate over all of them to find it out.
struct Names<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Names<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        // Glyph names are stored as Pascal Strings.
        // Meaning u8 (len) + [u8] (data).
        let len = usize::from(*self.data.get(self.offset)?);
        self.offset += 1;

        // An empty name is an error.
        if len == 0 {
            return None;
        }

        let name = self.data.get(self.offset..self.offset + len)?;
        self.offset += len;
        Some(name)
    }
}
