use crate::read::{Readable, Reader};
use crate::write::{Writeable, Writer};
use crate::{Error, Result, Tag};
use std::collections::BTreeMap;

/// The largest Unicode code point.
const MAX_CODE_POINT: u32 = 0x10FFFF;

struct SequentialMapGroupRecord {
    start_char_code: u32,
    end_char_code: u32,
    start_glyph_id: u32,
}

impl Readable<'_> for SequentialMapGroupRecord {
    const SIZE: usize = 12;

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let start_char_code = r.read::<u32>()?;
        let end_char_code = r.read::<u32>()?;
        let start_glyph_id = r.read::<u32>()?;

        Some(Self { start_char_code, end_char_code, start_glyph_id })
    }
}

impl Writeable for SequentialMapGroupRecord {
    fn write(&self, w: &mut Writer) {
        w.write::<u32>(self.start_char_code);
        w.write::<u32>(self.end_char_code);
        w.write::<u32>(self.start_glyph_id);
    }
}

/// A format 12 subtable: segmented coverage of all Unicode planes.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Format12 {
    /// The language of Macintosh subtables, 0 otherwise.
    pub language: u32,
    /// Maps code points to glyph ids.
    pub mappings: BTreeMap<u32, u16>,
}

impl Format12 {
    /// Parse the subtable.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut r = Reader::new(data);
        r.read::<u16>()?; // format
        r.read::<u16>()?; // reserved
        r.read::<u32>()?; // length
        let language = r.read::<u32>()?;
        let num_groups = r.read::<u32>()?;
        let groups = r.read_vector::<SequentialMapGroupRecord>(num_groups as usize)?;

        let mut mappings = BTreeMap::new();
        for group in groups {
            let end = group.end_char_code.min(MAX_CODE_POINT);
            for code_point in group.start_char_code..=end {
                let id = group.start_glyph_id.checked_add(code_point - group.start_char_code);
                // Glyph ids past the 16-bit range can't exist.
                let Some(id) = id.and_then(|id| u16::try_from(id).ok()) else { break };
                if id != 0 {
                    mappings.insert(code_point, id);
                }
            }
        }

        Some(Format12 { language, mappings })
    }

    /// Encode the subtable with one group per run of consecutive code points
    /// and glyph ids.
    pub fn write(&self) -> Result<Vec<u8>> {
        let mut groups = vec![];
        let mut map_iter = self.mappings.iter().map(|(&c, &g)| (c, g));

        if let Some(first) = map_iter.next() {
            let mut cur_start = first.0;
            let mut cur_gid = first.1;
            let mut cur_range = 0;

            for next in map_iter {
                if next.0 == cur_start + cur_range + 1
                    && u32::from(next.1) == u32::from(cur_gid) + cur_range + 1
                {
                    cur_range += 1;
                    continue;
                }

                groups.push(SequentialMapGroupRecord {
                    start_char_code: cur_start,
                    end_char_code: cur_start + cur_range,
                    start_glyph_id: u32::from(cur_gid),
                });

                cur_start = next.0;
                cur_gid = next.1;
                cur_range = 0;
            }

            groups.push(SequentialMapGroupRecord {
                start_char_code: cur_start,
                end_char_code: cur_start + cur_range,
                start_glyph_id: u32::from(cur_gid),
            });
        }

        // format + reserved + length + language + num_groups + groups
        let length = 2 + 2 + 4 + 4 + 4 + SequentialMapGroupRecord::SIZE * groups.len();
        let length = u32::try_from(length).map_err(|_| Error::Overflow {
            tag: Tag::CMAP,
            what: "format 12 subtable length".into(),
        })?;

        let mut w = Writer::with_capacity(length as usize);
        w.write::<u16>(12);
        w.write::<u16>(0);
        w.write::<u32>(length);
        w.write::<u32>(self.language);
        w.write::<u32>(groups.len() as u32);
        for group in &groups {
            w.write(group);
        }

        Ok(w.finish())
    }
}
