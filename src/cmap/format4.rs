use crate::read::{read_at, Reader};
use crate::write::Writer;
use crate::{Error, Result, Tag};
use std::collections::BTreeMap;

/// A format 4 subtable: segment mapping to delta values, for the Basic
/// Multilingual Plane.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Format4 {
    /// The language of Macintosh subtables, 0 otherwise.
    pub language: u16,
    /// Maps code points to glyph ids.
    pub mappings: BTreeMap<u16, u16>,
}

/// The raw segment arrays of a format 4 subtable.
struct Segments<'a> {
    end_codes: Vec<u16>,
    start_codes: Vec<u16>,
    id_deltas: Vec<i16>,
    id_range_offsets: Vec<u16>,
    glyph_id_array: &'a [u8],
}

impl Segments<'_> {
    /// Returns a glyph index for a code point.
    fn glyph_index(&self, code_point: u16) -> Option<u16> {
        // A custom binary search.
        let mut start = 0;
        let mut end = self.start_codes.len();
        while end > start {
            let index = (start + end) / 2;
            let end_value = *self.end_codes.get(index)?;
            if end_value >= code_point {
                let start_value = *self.start_codes.get(index)?;
                if start_value > code_point {
                    end = index;
                } else {
                    let id_range_offset = *self.id_range_offsets.get(index)?;
                    let id_delta = *self.id_deltas.get(index)?;
                    if id_range_offset == 0 {
                        return Some(code_point.wrapping_add(id_delta as u16));
                    } else if id_range_offset == 0xFFFF {
                        // Some malformed fonts have 0xFFFF as the last offset,
                        // which is invalid and should be ignored.
                        return None;
                    }

                    let delta = (u32::from(code_point) - u32::from(start_value)) * 2;
                    let delta = u16::try_from(delta).ok()?;

                    let id_range_offset_pos = (index * 2) as u16;
                    let pos = id_range_offset_pos.wrapping_add(delta);
                    let pos = pos.wrapping_add(id_range_offset);

                    let glyph_array_value =
                        read_at::<u16>(self.glyph_id_array, usize::from(pos))?;

                    // 0 indicates missing glyph.
                    if glyph_array_value == 0 {
                        return None;
                    }

                    return Some(glyph_array_value.wrapping_add(id_delta as u16));
                }
            } else {
                start = index + 1;
            }
        }

        None
    }

    /// Calls `f` for each codepoint defined in this table.
    fn codepoints(&self, mut f: impl FnMut(u16)) {
        for (start, end) in self.start_codes.iter().zip(&self.end_codes) {
            // OxFFFF value is special and indicates codes end.
            if *start == *end && *start == 0xFFFF {
                break;
            }

            for code_point in *start..=*end {
                f(code_point);
            }
        }
    }
}

impl Format4 {
    /// Parse the subtable.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut r = Reader::new(data);
        r.skip_bytes(4)?; // format + length
        let language = r.read::<u16>()?;
        let seg_count_x2 = r.read::<u16>()?;
        if seg_count_x2 < 2 {
            return None;
        }

        let seg_count = usize::from(seg_count_x2 / 2);
        r.skip_bytes(6)?; // search range + entry selector + range shift
        let end_codes = r.read_vector::<u16>(seg_count)?;
        r.skip::<u16>()?; // reserved pad
        let start_codes = r.read_vector::<u16>(seg_count)?;
        let id_deltas = r.read_vector::<i16>(seg_count)?;

        // Range offsets are relative to their own position.
        let glyph_id_array = r.tail()?;
        let id_range_offsets = r.read_vector::<u16>(seg_count)?;

        let segments =
            Segments { end_codes, start_codes, id_deltas, id_range_offsets, glyph_id_array };

        let mut mappings = BTreeMap::new();
        segments.codepoints(|c| {
            if let Some(g) = segments.glyph_index(c) {
                if g != 0 {
                    mappings.insert(c, g);
                }
            }
        });

        Some(Format4 { language, mappings })
    }

    /// Encode the subtable with one delta segment per run of consecutive
    /// code points and glyph ids.
    pub fn write(&self) -> Result<Vec<u8>> {
        let delta = |(c, g): (u16, u16)| g.wrapping_sub(c) as i16;

        let mut segments = vec![];
        // The final segment must be 0xFFFF and maps to nothing.
        let mut map_iter = self
            .mappings
            .iter()
            .map(|(&c, &g)| (c, g))
            .filter(|&(c, _)| c != 0xFFFF);

        if let Some(first) = map_iter.next() {
            let mut cur_start = first.0;
            let mut cur_delta = delta(first);
            let mut cur_range = 0;

            for next in map_iter {
                if next.0 == cur_start + cur_range + 1 && delta(next) == cur_delta {
                    cur_range += 1;
                    continue;
                }

                segments.push((cur_start, cur_start + cur_range, cur_delta));
                cur_start = next.0;
                cur_delta = delta(next);
                cur_range = 0;
            }

            segments.push((cur_start, cur_start + cur_range, cur_delta));
        }

        segments.push((0xFFFF, 0xFFFF, 1));

        let length = 16 + 8 * segments.len();
        let length = u16::try_from(length).map_err(|_| Error::Overflow {
            tag: Tag::CMAP,
            what: "format 4 subtable length".into(),
        })?;

        let seg_count = segments.len() as u16;
        let seg_count_x2 = 2 * seg_count;
        let floor_log_2 = (u16::BITS - seg_count.leading_zeros()) - 1;
        let search_range = 2 * 2u16.pow(floor_log_2);
        let entry_selector = floor_log_2 as u16;
        let range_shift = seg_count_x2 - search_range;

        let mut w = Writer::with_capacity(usize::from(length));
        w.write::<u16>(4);
        w.write::<u16>(length);
        w.write::<u16>(self.language);
        w.write::<u16>(seg_count_x2);
        w.write::<u16>(search_range);
        w.write::<u16>(entry_selector);
        w.write::<u16>(range_shift);
        for segment in &segments {
            w.write::<u16>(segment.1);
        }
        w.write::<u16>(0); // reserved pad
        for segment in &segments {
            w.write::<u16>(segment.0);
        }
        for segment in &segments {
            w.write::<i16>(segment.2);
        }
        for _ in &segments {
            w.write::<u16>(0);
        }

        Ok(w.finish())
    }
}
