use crate::read::{Reader, U24};
use crate::write::{patch_u32, Writer};
use crate::{Error, Result, Tag};

/// A format 14 subtable: Unicode variation sequences.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Format14 {
    /// The variation selector records, sorted by selector.
    pub selectors: Vec<VariationSelector>,
}

/// The variation sequences of one variation selector.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct VariationSelector {
    /// The variation selector code point.
    pub var_selector: u32,
    /// Ranges `(start, additional count)` of base characters whose sequence
    /// maps to the default glyph of the base character.
    pub default_uvs: Vec<(u32, u8)>,
    /// Sequences `(base character, glyph id)` with a glyph of their own.
    pub non_default_uvs: Vec<(u32, u16)>,
}

impl Format14 {
    /// Parse the subtable.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut r = Reader::new(data);
        r.read::<u16>()?; // format
        r.read::<u32>()?; // length
        let count = r.read::<u32>()?;

        let mut selectors = vec![];
        for _ in 0..count {
            let var_selector = r.read::<U24>()?.0;
            let default_offset = r.read::<u32>()? as usize;
            let non_default_offset = r.read::<u32>()? as usize;

            let mut record = VariationSelector { var_selector, ..Default::default() };

            if default_offset != 0 {
                let mut s = Reader::new_at(data, default_offset);
                let ranges = s.read::<u32>()?;
                for _ in 0..ranges {
                    record.default_uvs.push((s.read::<U24>()?.0, s.read::<u8>()?));
                }
            }

            if non_default_offset != 0 {
                let mut s = Reader::new_at(data, non_default_offset);
                let mappings = s.read::<u32>()?;
                for _ in 0..mappings {
                    record.non_default_uvs.push((s.read::<U24>()?.0, s.read::<u16>()?));
                }
            }

            selectors.push(record);
        }

        Some(Format14 { selectors })
    }

    /// Encode the subtable.
    pub fn write(&self) -> Result<Vec<u8>> {
        let mut selectors = self.selectors.iter().collect::<Vec<_>>();
        selectors.sort_by_key(|record| record.var_selector);

        let mut header = Writer::new();
        let mut tables = Writer::new();
        let header_len = 10 + 11 * selectors.len();

        header.write::<u16>(14);
        // Length is patched in the end.
        header.write::<u32>(0);
        header.write::<u32>(selectors.len() as u32);

        for record in selectors {
            header.write(U24(record.var_selector));

            if record.default_uvs.is_empty() {
                header.write::<u32>(0);
            } else {
                header.write::<u32>((header_len + tables.len()) as u32);
                tables.write::<u32>(record.default_uvs.len() as u32);
                for &(start, additional) in &record.default_uvs {
                    tables.write(U24(start));
                    tables.write::<u8>(additional);
                }
            }

            if record.non_default_uvs.is_empty() {
                header.write::<u32>(0);
            } else {
                header.write::<u32>((header_len + tables.len()) as u32);
                tables.write::<u32>(record.non_default_uvs.len() as u32);
                for &(unicode, glyph_id) in &record.non_default_uvs {
                    tables.write(U24(unicode));
                    tables.write::<u16>(glyph_id);
                }
            }
        }

        header.extend(&tables.finish());
        let mut data = header.finish();
        let length = u32::try_from(data.len()).map_err(|_| Error::Overflow {
            tag: Tag::CMAP,
            what: "format 14 subtable length".into(),
        })?;
        patch_u32(&mut data, 2, length);
        Ok(data)
    }
}
