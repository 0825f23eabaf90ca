//! Assembling tables into a font file.
//!
//! The directory is always sorted by tag, table bodies are padded with zeros
//! to a multiple of four bytes and the checksum adjustment in `head` is
//! patched last, once the whole file is known.

use crate::options::CommitOptions;
use crate::read::Readable;
use crate::write::{patch_u32, Writer};
use crate::{Error, Result, TableRecord, Tag};
use log::debug;
use std::borrow::Cow;

/// The value the whole file has to sum up to.
const CHECKSUM_MAGIC: u32 = 0xB1B0AFBA;

/// Offset of `checkSumAdjustment` in `head`.
const ADJUSTMENT_OFFSET: usize = 8;

/// Writes tables into a single-font sfnt file.
#[derive(Debug)]
pub struct SfntWriter<'a> {
    version: u32,
    tables: Vec<(Tag, Cow<'a, [u8]>)>,
}

impl<'a> SfntWriter<'a> {
    /// Create a writer for a font with the given sfnt version, e.g.
    /// `0x00010000` for TrueType outlines.
    pub fn new(version: u32) -> Self {
        Self { version, tables: vec![] }
    }

    /// Add a table. A table that was added before under the same tag is
    /// replaced.
    pub fn push(&mut self, tag: Tag, data: impl Into<Cow<'a, [u8]>>) {
        let data = data.into();
        match self.tables.iter_mut().find(|(prev, _)| *prev == tag) {
            Some(entry) => entry.1 = data,
            None => self.tables.push((tag, data)),
        }
    }

    /// The number of tables added so far.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no tables were added.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Construct the font file.
    pub fn finish(mut self, options: &CommitOptions) -> Result<Vec<u8>> {
        let overflow = |what: &str| Error::Overflow {
            tag: Tag(*b"sfnt"),
            what: what.to_string(),
        };

        let count =
            u16::try_from(self.tables.len()).map_err(|_| overflow("table count"))?;

        // Lay out the bodies in the requested order.
        let mut order = self.tables.iter().map(|(tag, _)| *tag).collect::<Vec<_>>();
        options.table_order.sort(&mut order);
        self.tables.sort_by_key(|(tag, _)| {
            order.iter().position(|t| t == tag).unwrap_or(order.len())
        });

        // This variable will hold the offset to the checksum adjustment field
        // in the head table, which we'll have to write in the end (after
        // checksumming the whole font).
        let mut checksum_adjustment_offset = None;

        let mut records = Vec::with_capacity(self.tables.len());
        let mut offset = 12 + self.tables.len() * TableRecord::SIZE;
        for (tag, data) in &mut self.tables {
            if *tag == Tag::HEAD {
                // Zero out checksum field in head table.
                let field = data
                    .to_mut()
                    .get_mut(ADJUSTMENT_OFFSET..ADJUSTMENT_OFFSET + 4)
                    .ok_or_else(|| Error::Inconsistent {
                        tag: Tag::HEAD,
                        reason: "table is too short".into(),
                    })?;
                field.fill(0);
                checksum_adjustment_offset = Some(offset + ADJUSTMENT_OFFSET);
            }

            let len = data.len();
            records.push(TableRecord {
                tag: *tag,
                checksum: checksum(data),
                offset: u32::try_from(offset).map_err(|_| overflow("table offset"))?,
                length: u32::try_from(len).map_err(|_| overflow("table length"))?,
            });

            debug!("{tag}: {len} bytes at {offset}");

            // Increase offset, plus padding zeros to align to 4 bytes.
            offset += len;
            while offset % 4 != 0 {
                offset += 1;
            }
        }

        let mut w = Writer::with_capacity(offset);
        w.write::<u32>(self.version);

        // Write table directory.
        let (search_range, entry_selector, range_shift) = search_params(count);
        w.write(count);
        w.write(search_range);
        w.write(entry_selector);
        w.write(range_shift);

        // Tables shall be sorted by tag.
        records.sort_by_key(|record| record.tag);
        for record in &records {
            w.write(record);
        }

        // Write tables.
        for (_, data) in &self.tables {
            // Write data plus padding zeros to align to 4 bytes.
            w.extend(data);
            w.align(4);
        }

        // Write checksum adjustment field in head table.
        let mut data = w.finish();
        if let Some(i) = checksum_adjustment_offset {
            if options.checksum_adjustment {
                let sum = checksum(&data);
                patch_u32(&mut data, i, CHECKSUM_MAGIC.wrapping_sub(sum));
            }
        }

        Ok(data)
    }
}

/// Compute `searchRange`, `entrySelector` and `rangeShift` for a directory
/// with `count` entries.
pub(crate) fn search_params(count: u16) -> (u16, u16, u16) {
    if count == 0 {
        return (0, 0, 0);
    }

    let entry_selector = 15 - count.leading_zeros() as u16;
    let search_range = (1u32 << entry_selector) * 16;
    let range_shift = u32::from(count) * 16 - search_range;
    (search_range as u16, entry_selector, range_shift as u16)
}

/// Calculate a checksum over the sliced data as a sum of u32s. If the data
/// length is not a multiple of four, it is treated as if padded with zero to a
/// length that is a multiple of four.
pub fn checksum(data: &[u8]) -> u32 {
    let mut sum = 0u32;
    for chunk in data.chunks(4) {
        let mut bytes = [0; 4];
        bytes[..chunk.len()].copy_from_slice(chunk);
        sum = sum.wrapping_add(u32::from_be_bytes(bytes));
    }
    sum
}
