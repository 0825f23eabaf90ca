//! The `glyf` table contains the outlines of the glyphs. It is edited as a list
//! of opaque per-glyph descriptions, which is all that is needed to rebuild
//! `loca`. Glyph headers and composite components are only looked at to keep
//! the `maxp` profile up to date.

use crate::loca::Loca;
use crate::read::{read_at, Reader};
use crate::table::{builder_conversions, Table};
use crate::write::Writer;
use crate::{Error, Font, Result, Tag};
use log::warn;

const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;

/// The glyph data table.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Glyf {
    glyphs: Vec<Vec<u8>>,
}

impl Glyf {
    /// Create a table from glyph descriptions, indexed by glyph id. Empty
    /// descriptions are glyphs without outline.
    pub fn new(glyphs: Vec<Vec<u8>>) -> Self {
        Self { glyphs }
    }

    /// The number of glyphs.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Whether there are no glyphs.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// All glyph descriptions.
    pub fn glyphs(&self) -> &[Vec<u8>] {
        &self.glyphs
    }

    /// Mutable access to the glyph descriptions, e.g. to add glyphs.
    pub fn glyphs_mut(&mut self) -> &mut Vec<Vec<u8>> {
        &mut self.glyphs
    }

    /// The description of one glyph.
    pub fn glyph(&self, id: u16) -> Option<&[u8]> {
        self.glyphs.get(usize::from(id)).map(Vec::as_slice)
    }

    /// Replace the description of one glyph. Returns `false` if there is no
    /// glyph with this id.
    pub fn set_glyph(&mut self, id: u16, data: Vec<u8>) -> bool {
        match self.glyphs.get_mut(usize::from(id)) {
            Some(glyph) => {
                *glyph = data;
                true
            }
            None => false,
        }
    }

    /// The size of the encoded table. Every glyph is padded to an even length.
    pub fn encoded_len(&self) -> usize {
        self.glyphs.iter().map(|glyph| padded_len(glyph.len())).sum()
    }
}

/// Glyphs are padded to two bytes so that they can be addressed by short
/// `loca` offsets.
pub(crate) fn padded_len(len: usize) -> usize {
    len + (len % 2)
}

impl Table for Glyf {
    const TAG: Tag = Tag::GLYF;

    fn read(font: &Font) -> Option<Self> {
        let data = font.table(Self::TAG)?;
        let loca = Loca::read(font)?;

        let mut glyphs = Vec::with_capacity(loca.offsets().len().saturating_sub(1));
        for pair in loca.offsets().windows(2) {
            let range = pair[0] as usize..pair[1] as usize;
            let Some(glyph) = data.get(range) else {
                warn!("glyf table does not match loca");
                return None;
            };
            glyphs.push(glyph.to_vec());
        }

        Some(Glyf { glyphs })
    }

    fn write(&self) -> Result<Vec<u8>> {
        let len = self.encoded_len();
        if u32::try_from(len).is_err() {
            return Err(Error::Overflow { tag: Self::TAG, what: "table length".into() });
        }

        let mut w = Writer::with_capacity(len);
        for glyph in &self.glyphs {
            w.extend(glyph);
            w.align(2);
        }
        Ok(w.finish())
    }

    builder_conversions!(Glyf);
}

/// The header of a non-empty glyph description.
#[derive(Debug, Copy, Clone)]
pub(crate) struct GlyphHeader {
    pub number_of_contours: i16,
}

impl GlyphHeader {
    /// Parse the header. Returns `Some(None)` for empty glyphs and `None`
    /// if the glyph is too short to have a header.
    pub fn parse(data: &[u8]) -> Option<Option<Self>> {
        if data.is_empty() {
            return Some(None);
        }

        // Number of contours and the bounding box.
        if data.len() < 10 {
            return None;
        }

        let number_of_contours = read_at::<i16>(data, 0)?;
        Some(Some(Self { number_of_contours }))
    }

    pub fn is_composite(&self) -> bool {
        self.number_of_contours < 0
    }

    /// The number of points of a simple glyph.
    pub fn simple_points(&self, data: &[u8]) -> Option<u16> {
        let contours = usize::try_from(self.number_of_contours).ok()?;
        if contours == 0 {
            return Some(0);
        }
        let last_end_point = read_at::<u16>(data, 10 + 2 * (contours - 1))?;
        last_end_point.checked_add(1)
    }

    /// The length of the glyph's instructions.
    pub fn instructions_len(&self, data: &[u8]) -> Option<u16> {
        match usize::try_from(self.number_of_contours) {
            Ok(contours) => read_at::<u16>(data, 10 + 2 * contours),
            Err(_) => {
                let mut components = self.components(data);
                for component in components.by_ref() {
                    component?;
                }

                if components.flags & WE_HAVE_INSTRUCTIONS == 0 {
                    return Some(0);
                }

                read_at::<u16>(data, components.offset)
            }
        }
    }

    /// The components of a composite glyph. Yields `None` once if a
    /// component is malformed.
    pub fn components<'a>(&self, data: &'a [u8]) -> Components<'a> {
        Components { data, offset: 10, flags: 0, done: !self.is_composite() }
    }
}

/// An iterator over the glyph ids referenced by a composite glyph.
pub(crate) struct Components<'a> {
    data: &'a [u8],
    /// The offset of the next component, or after the last one.
    offset: usize,
    /// The flags of the last component read.
    flags: u16,
    done: bool,
}

impl Iterator for Components<'_> {
    type Item = Option<u16>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut r = Reader::new_at(self.data, self.offset);
        let (Some(flags), Some(glyph_id)) = (r.read::<u16>(), r.read::<u16>()) else {
            self.done = true;
            return Some(None);
        };

        let mut len = 4;
        len += if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
        if flags & WE_HAVE_A_SCALE != 0 {
            len += 2;
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            len += 4;
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            len += 8;
        }

        self.offset += len;
        self.flags = flags;
        if flags & MORE_COMPONENTS == 0 {
            self.done = true;
        }

        if self.offset > self.data.len() {
            self.done = true;
            return Some(None);
        }

        Some(Some(glyph_id))
    }
}
