//! The contract between the edit model and the individual table formats.
//!
//! Every structured table implements [`Table`]. Edited tables are stored as a
//! [`TableBuilder`], a closed enum over all structured tables plus raw bytes,
//! so that the dependency rules can find out what they are looking at
//! without any dynamic dispatch.

use crate::font::Font;
use crate::layout::{Gpos, Gsub};
use crate::{
    Cmap, Glyf, Hdmx, Head, Hhea, Hmtx, Loca, Ltsh, Maxp, Os2, Post, Result, Tag, Vhea,
    Vmtx,
};

/// A table format that can be decoded from a font and encoded again.
pub trait Table: Sized + Clone {
    /// The tag of the table.
    const TAG: Tag;

    /// Decode the table from a font.
    ///
    /// Some tables can only be interpreted with the help of other tables,
    /// which is why this receives the whole font. Returns `None` if the
    /// table is missing or malformed.
    fn read(font: &Font) -> Option<Self>;

    /// Encode the table.
    ///
    /// Encoding is deterministic and does not modify the table.
    fn write(&self) -> Result<Vec<u8>>;

    /// Wrap the table into a builder.
    fn into_builder(self) -> TableBuilder;

    /// Access the table if the builder holds one of this type.
    fn from_builder(builder: &TableBuilder) -> Option<&Self>;

    /// Mutably access the table if the builder holds one of this type.
    fn from_builder_mut(builder: &mut TableBuilder) -> Option<&mut Self>;
}

/// An edited table.
///
/// Structured builders take part in the dependency rules of a commit, raw
/// ones are written as they are and never looked into.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub enum TableBuilder {
    Raw(Vec<u8>),
    Head(Head),
    Maxp(Maxp),
    Hhea(Hhea),
    Vhea(Vhea),
    Hmtx(Hmtx),
    Vmtx(Vmtx),
    Os2(Os2),
    Post(Post),
    Cmap(Cmap),
    Glyf(Glyf),
    Loca(Loca),
    Hdmx(Hdmx),
    Ltsh(Ltsh),
    Gsub(Gsub),
    Gpos(Gpos),
}

impl TableBuilder {
    /// Whether the builder holds opaque bytes.
    pub fn is_raw(&self) -> bool {
        matches!(self, TableBuilder::Raw(_))
    }

    /// Encode the table.
    pub fn write(&self) -> Result<Vec<u8>> {
        match self {
            TableBuilder::Raw(data) => Ok(data.clone()),
            TableBuilder::Head(table) => table.write(),
            TableBuilder::Maxp(table) => table.write(),
            TableBuilder::Hhea(table) => table.write(),
            TableBuilder::Vhea(table) => table.write(),
            TableBuilder::Hmtx(table) => table.write(),
            TableBuilder::Vmtx(table) => table.write(),
            TableBuilder::Os2(table) => table.write(),
            TableBuilder::Post(table) => table.write(),
            TableBuilder::Cmap(table) => table.write(),
            TableBuilder::Glyf(table) => table.write(),
            TableBuilder::Loca(table) => table.write(),
            TableBuilder::Hdmx(table) => table.write(),
            TableBuilder::Ltsh(table) => table.write(),
            TableBuilder::Gsub(table) => table.write(),
            TableBuilder::Gpos(table) => table.write(),
        }
    }
}

/// Decode a table of the font into a structured builder, based on its tag.
///
/// Returns `None` for tags without a structured format and for tables that
/// cannot be decoded.
pub(crate) fn decode(font: &Font, tag: Tag) -> Option<TableBuilder> {
    fn builder<T: Table>(font: &Font) -> Option<TableBuilder> {
        T::read(font).map(T::into_builder)
    }

    match tag {
        Tag::HEAD => builder::<Head>(font),
        Tag::MAXP => builder::<Maxp>(font),
        Tag::HHEA => builder::<Hhea>(font),
        Tag::VHEA => builder::<Vhea>(font),
        Tag::HMTX => builder::<Hmtx>(font),
        Tag::VMTX => builder::<Vmtx>(font),
        Tag::OS2 => builder::<Os2>(font),
        Tag::POST => builder::<Post>(font),
        Tag::CMAP => builder::<Cmap>(font),
        Tag::GLYF => builder::<Glyf>(font),
        Tag::LOCA => builder::<Loca>(font),
        Tag::HDMX => builder::<Hdmx>(font),
        Tag::LTSH => builder::<Ltsh>(font),
        _ => None,
    }
}

/// Implements the builder conversions of [`Table`] for a variant of
/// [`TableBuilder`].
macro_rules! builder_conversions {
    ($variant:ident) => {
        fn into_builder(self) -> $crate::table::TableBuilder {
            $crate::table::TableBuilder::$variant(self)
        }

        fn from_builder(builder: &$crate::table::TableBuilder) -> Option<&Self> {
            match builder {
                $crate::table::TableBuilder::$variant(table) => Some(table),
                _ => None,
            }
        }

        fn from_builder_mut(
            builder: &mut $crate::table::TableBuilder,
        ) -> Option<&mut Self> {
            match builder {
                $crate::table::TableBuilder::$variant(table) => Some(table),
                _ => None,
            }
        }
    };
}

pub(crate) use builder_conversions;
