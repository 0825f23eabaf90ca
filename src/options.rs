use crate::Tag;

/// Configures how [`FontModel::commit`](crate::FontModel::commit) writes a font.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CommitOptions {
    /// The order of the table bodies in the file. The table directory itself
    /// is always sorted by tag.
    pub table_order: TableOrder,
    /// Write tables even if they depend on an edited table and were not
    /// repaired. Off by default, because such fonts are usually broken.
    pub allow_stale: bool,
    /// Patch `head.checkSumAdjustment` so that the whole file sums up to
    /// `0xB1B0AFBA`. If disabled, the field is left zeroed.
    pub checksum_adjustment: bool,
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            table_order: TableOrder::ByTag,
            allow_stale: false,
            checksum_adjustment: true,
        }
    }
}

/// The order in which table bodies are laid out in the file.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum TableOrder {
    /// Ascending tag order, same as the directory.
    #[default]
    ByTag,
    /// The order recommended by the OpenType specification for TrueType or
    /// CFF fonts. Tables without a recommended position follow in tag order.
    Recommended,
}

const TRUETYPE_ORDER: &[Tag] = &[
    Tag::HEAD,
    Tag::HHEA,
    Tag::MAXP,
    Tag::OS2,
    Tag::HMTX,
    Tag::LTSH,
    Tag::VDMX,
    Tag::HDMX,
    Tag::CMAP,
    Tag::FPGM,
    Tag::PREP,
    Tag::CVT,
    Tag::LOCA,
    Tag::GLYF,
    Tag::KERN,
    Tag::NAME,
    Tag::POST,
    Tag::GASP,
    Tag::PCLT,
    Tag::DSIG,
];

const CFF_ORDER: &[Tag] = &[
    Tag::HEAD,
    Tag::HHEA,
    Tag::MAXP,
    Tag::OS2,
    Tag::NAME,
    Tag::CMAP,
    Tag::POST,
    Tag::CFF,
];

impl TableOrder {
    /// Sort tags into this order.
    pub(crate) fn sort(self, tags: &mut [Tag]) {
        tags.sort();
        if self == TableOrder::ByTag {
            return;
        }

        let cff = tags.contains(&Tag::CFF) || tags.contains(&Tag::CFF2);
        let order = if cff { CFF_ORDER } else { TRUETYPE_ORDER };
        // Stable, so unknown tags stay in tag order behind the known ones.
        tags.sort_by_key(|tag| {
            order.iter().position(|known| known == tag).unwrap_or(order.len())
        });
    }
}
