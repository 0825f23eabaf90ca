/*!
Edits OpenType fonts and writes back consistent, checksummed files.

A font is opened as a read-only [`Font`], edits are collected in a
[`FontModel`] and [`FontModel::commit`] produces a new font file. During the
commit, derived tables are repaired or validated by a fixed list of dependency
rules: changing the glyph count resizes the metrics tables, a new `glyf`
rebuilds `loca` and updates `head.indexToLocFormat`, `cmap` and `post` are
checked against `maxp` and so on. If a table depends on an edited table but
cannot be repaired, the commit fails and nothing is written.

# Example
In the example below, we give the font two more, empty glyphs. `maxp`,
`loca` and `head` follow the new `glyf` table. The new glyphs inherit the
advance width of the last glyph, and `hhea`, `hmtx` and `OS/2` are updated
accordingly.

```no_run
use fontedit::{Font, FontModel, Glyf};

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let data = std::fs::read("fonts/NotoSans-Regular.ttf")?;
let font = Font::new(&data, 0)?;

let mut model = FontModel::new(font);
if let Some(glyf) = model.edit::<Glyf>() {
    glyf.glyphs_mut().extend([vec![], vec![]]);
}

let out = model.commit()?;
std::fs::write("target/NotoSans-More.ttf", out)?;
# Ok(())
# }
```

GSUB and GPOS tables are assembled from a [`LayoutTable`] builder. Lookups
whose subtables cannot be reached with 16-bit offsets are moved behind
Extension subtables automatically.
*/

#![deny(unsafe_code)]
#![deny(missing_docs)]

mod cmap;
mod font;
mod glyf;
mod hdmx;
mod head;
mod hhea;
mod hmtx;
pub mod layout;
mod loca;
mod ltsh;
mod maxp;
mod model;
mod options;
mod os2;
mod post;
mod read;
mod rules;
mod sfnt;
mod table;
mod vhea;
mod write;

pub use crate::cmap::{
    Cmap, CmapSubtable, EncodingRecord, Format12, Format14, Format4, VariationSelector,
};
pub use crate::font::{Collection, Font, FontKind, TableSlice};
pub use crate::glyf::Glyf;
pub use crate::hdmx::{DeviceRecord, Hdmx};
pub use crate::head::Head;
pub use crate::hhea::Hhea;
pub use crate::hmtx::{Hmtx, Metric, Vmtx};
pub use crate::layout::{Gpos, Gsub, LayoutTable};
pub use crate::loca::Loca;
pub use crate::ltsh::Ltsh;
pub use crate::maxp::{Maxp, MaxpProfile};
pub use crate::model::FontModel;
pub use crate::options::{CommitOptions, TableOrder};
pub use crate::os2::Os2;
pub use crate::post::{GlyphNames, Post, STANDARD_NAMES};
pub use crate::sfnt::{checksum, SfntWriter};
pub use crate::table::{Table, TableBuilder};
pub use crate::vhea::Vhea;

use crate::read::{Readable, Reader};
use crate::write::{Writeable, Writer};
use std::fmt::{self, Debug, Display, Formatter};

/// A 4-byte OpenType tag.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Tag(pub [u8; 4]);

#[allow(missing_docs)]
impl Tag {
    // General tables.
    pub const CMAP: Self = Self(*b"cmap");
    pub const HEAD: Self = Self(*b"head");
    pub const HHEA: Self = Self(*b"hhea");
    pub const HMTX: Self = Self(*b"hmtx");
    pub const MAXP: Self = Self(*b"maxp");
    pub const NAME: Self = Self(*b"name");
    pub const OS2: Self = Self(*b"OS/2");
    pub const POST: Self = Self(*b"post");

    // Vertical metrics and device tables.
    pub const VHEA: Self = Self(*b"vhea");
    pub const VMTX: Self = Self(*b"vmtx");
    pub const HDMX: Self = Self(*b"hdmx");
    pub const LTSH: Self = Self(*b"LTSH");
    pub const VDMX: Self = Self(*b"VDMX");
    pub const KERN: Self = Self(*b"kern");
    pub const PCLT: Self = Self(*b"PCLT");
    pub const DSIG: Self = Self(*b"DSIG");

    // TrueType.
    pub const GLYF: Self = Self(*b"glyf");
    pub const LOCA: Self = Self(*b"loca");
    pub const PREP: Self = Self(*b"prep");
    pub const FPGM: Self = Self(*b"fpgm");
    pub const CVT: Self = Self(*b"cvt ");
    pub const GASP: Self = Self(*b"gasp");

    // CFF.
    pub const CFF: Self = Self(*b"CFF ");
    pub const CFF2: Self = Self(*b"CFF2");
    pub const VORG: Self = Self(*b"VORG");

    // Layout.
    pub const GSUB: Self = Self(*b"GSUB");
    pub const GPOS: Self = Self(*b"GPOS");
    pub const GDEF: Self = Self(*b"GDEF");

    // Variations.
    pub const FVAR: Self = Self(*b"fvar");
    pub const GVAR: Self = Self(*b"gvar");
    pub const CVAR: Self = Self(*b"cvar");

    // Bitmap and color fonts.
    pub const EBDT: Self = Self(*b"EBDT");
    pub const EBLC: Self = Self(*b"EBLC");
    pub const CBDT: Self = Self(*b"CBDT");
    pub const CBLC: Self = Self(*b"CBLC");
    pub const SBIX: Self = Self(*b"sbix");

    // Apple.
    pub const ZAPF: Self = Self(*b"Zapf");
}

impl Readable<'_> for Tag {
    const SIZE: usize = 4;

    fn read(r: &mut Reader) -> Option<Self> {
        r.read::<[u8; 4]>().map(Self)
    }
}

impl Writeable for Tag {
    fn write(&self, w: &mut Writer) {
        w.write::<[u8; 4]>(self.0)
    }
}

impl Debug for Tag {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.pad(std::str::from_utf8(&self.0).unwrap_or("..."))
    }
}

/// Locates a table in the font file.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TableRecord {
    /// The table's tag.
    pub tag: Tag,
    /// The checksum over the zero-padded table data.
    pub checksum: u32,
    /// The offset from the start of the file.
    pub offset: u32,
    /// The unpadded length of the table.
    pub length: u32,
}

impl Readable<'_> for TableRecord {
    const SIZE: usize = 16;

    fn read(r: &mut Reader) -> Option<Self> {
        Some(TableRecord {
            tag: r.read::<Tag>()?,
            checksum: r.read::<u32>()?,
            offset: r.read::<u32>()?,
            length: r.read::<u32>()?,
        })
    }
}

impl Writeable for TableRecord {
    fn write(&self, w: &mut Writer) {
        w.write::<Tag>(self.tag);
        w.write::<u32>(self.checksum);
        w.write::<u32>(self.offset);
        w.write::<u32>(self.length);
    }
}

/// The result type for everything.
pub type Result<T> = std::result::Result<T, Error>;

/// Reading or committing a font failed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// The file contains an unknown kind of font.
    UnknownKind,
    /// The font directory is malformed.
    ///
    /// Malformed individual tables are never reported through this error.
    /// They are simply not decodable, and their bytes are passed through.
    MalformedFont,
    /// A table is missing.
    ///
    /// This error only occurs if a table has to be repaired as a consequence
    /// of an edit and a table it needs is missing, e.g. `glyf` was edited
    /// but there is no `head` table to record the `loca` format in.
    MissingTable(Tag),
    /// A cross-table invariant does not hold and cannot be repaired.
    Inconsistent {
        /// The table that violates the invariant.
        tag: Tag,
        /// What is wrong with it.
        reason: String,
    },
    /// Tables depend on an edited table but were neither edited nor
    /// repaired during the commit.
    StaleTables(Vec<Tag>),
    /// An offset or count does not fit into its field.
    Overflow {
        /// The table being written.
        tag: Tag,
        /// Which field overflowed.
        what: String,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::UnknownKind => f.pad("unknown font kind"),
            Self::MalformedFont => f.pad("malformed font"),
            Self::MissingTable(tag) => write!(f, "missing {tag} table"),
            Self::Inconsistent { tag, reason } => {
                write!(f, "inconsistent {tag} table: {reason}")
            }
            Self::StaleTables(tags) => {
                f.write_str("stale tables that must be rebuilt:")?;
                for tag in tags {
                    write!(f, " {tag}")?;
                }
                Ok(())
            }
            Self::Overflow { tag, what } => write!(f, "overflow in {tag} table: {what}"),
        }
    }
}

impl std::error::Error for Error {}
