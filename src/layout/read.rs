//! Zero-copy access to the structure of an encoded GSUB or GPOS table.

use super::{GPOS_EXTENSION, GSUB_EXTENSION, USE_MARK_FILTERING_SET};
use crate::read::{read_at, LazyArray16, Reader};
use crate::Tag;

/// An encoded layout table.
#[derive(Debug, Copy, Clone)]
pub struct LayoutTableRef<'a> {
    data: &'a [u8],
    version: u32,
    script_list: usize,
    feature_list: usize,
    lookup_list: usize,
    variations: Option<usize>,
}

impl<'a> LayoutTableRef<'a> {
    /// Parse the table header.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut r = Reader::new(data);
        let version = r.read::<u32>()?;
        if version >> 16 != 1 {
            return None;
        }

        let script_list = usize::from(r.read::<u16>()?);
        let feature_list = usize::from(r.read::<u16>()?);
        let lookup_list = usize::from(r.read::<u16>()?);
        let variations = match version {
            0x00010000 => None,
            _ => Some(r.read::<u32>()? as usize).filter(|&offset| offset != 0),
        };

        Some(Self { data, version, script_list, feature_list, lookup_list, variations })
    }

    /// The table version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The tags of all scripts, in the order in which they are stored.
    pub fn script_tags(&self) -> Option<Vec<Tag>> {
        self.tags(self.script_list)
    }

    /// The tags of all features, in the order in which they are stored.
    pub fn feature_tags(&self) -> Option<Vec<Tag>> {
        self.tags(self.feature_list)
    }

    /// The feature indices of the default language system of a script, or
    /// of a specific language system if `lang` is given. The required feature
    /// comes first, if there is one.
    pub fn lang_sys_features(&self, script: Tag, lang: Option<Tag>) -> Option<Vec<u16>> {
        let offset = self.record(self.script_list, script)?;
        let script = self.script_list.checked_add(offset)?;

        let lang_sys = match lang {
            None => usize::from(read_at::<u16>(self.data, script)?),
            Some(lang) => self.record(script + 2, lang)?,
        };
        if lang_sys == 0 {
            return None;
        }

        let mut r = Reader::new_at(self.data, script + lang_sys);
        r.skip::<u16>()?; // lookupOrderOffset
        let required = r.read::<u16>()?;
        let count = r.read::<u16>()?;
        let features: LazyArray16<u16> = r.read_array16(count)?;

        let mut indices = Vec::with_capacity(usize::from(count) + 1);
        if required != 0xFFFF {
            indices.push(required);
        }
        indices.extend(features);
        Some(indices)
    }

    /// The lookup indices of a feature.
    pub fn feature_lookups(&self, index: u16) -> Option<Vec<u16>> {
        let record = self.feature_list + 2 + usize::from(index) * 6;
        let offset = usize::from(read_at::<u16>(self.data, record + 4)?);
        let mut r = Reader::new_at(self.data, self.feature_list + offset);
        r.skip::<u16>()?; // featureParamsOffset
        let count = r.read::<u16>()?;
        r.read_array16::<u16>(count).map(|lookups| lookups.into_iter().collect())
    }

    /// The FeatureParams of the feature with the given index, up to the end
    /// of the table. Their length depends on the feature tag.
    pub fn feature_params(&self, index: u16) -> Option<&'a [u8]> {
        let record = self.feature_list + 2 + usize::from(index) * 6;
        let feature = self.feature_list + usize::from(read_at::<u16>(self.data, record + 4)?);
        match read_at::<u16>(self.data, feature)? {
            0 => None,
            offset => self.data.get(feature + usize::from(offset)..),
        }
    }

    /// The number of lookups.
    pub fn lookup_count(&self) -> Option<u16> {
        read_at::<u16>(self.data, self.lookup_list)
    }

    /// A lookup.
    pub fn lookup(&self, index: u16) -> Option<LookupRef<'a>> {
        if index >= self.lookup_count()? {
            return None;
        }

        let record = self.lookup_list + 2 + usize::from(index) * 2;
        let offset = self.lookup_list + usize::from(read_at::<u16>(self.data, record)?);
        LookupRef::parse(self.data, offset)
    }

    /// The encoded FeatureVariations, up to the end of the table.
    pub fn variations(&self) -> Option<&'a [u8]> {
        self.data.get(self.variations?..)
    }

    fn tags(&self, list: usize) -> Option<Vec<Tag>> {
        let mut r = Reader::new_at(self.data, list);
        let count = r.read::<u16>()?;
        let mut tags = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            tags.push(r.read::<Tag>()?);
            r.skip::<u16>()?;
        }
        Some(tags)
    }

    /// Find the offset of a tag record in a list of `count, {tag, offset16}`.
    fn record(&self, list: usize, tag: Tag) -> Option<usize> {
        let mut r = Reader::new_at(self.data, list);
        let count = r.read::<u16>()?;
        for _ in 0..count {
            let record_tag = r.read::<Tag>()?;
            let offset = r.read::<u16>()?;
            if record_tag == tag {
                return Some(usize::from(offset));
            }
        }
        None
    }
}

/// An encoded lookup.
#[derive(Debug, Clone)]
pub struct LookupRef<'a> {
    data: &'a [u8],
    start: usize,
    kind: u16,
    flag: u16,
    offsets: LazyArray16<'a, u16>,
    mark_filtering_set: Option<u16>,
}

impl<'a> LookupRef<'a> {
    fn parse(data: &'a [u8], start: usize) -> Option<Self> {
        let mut r = Reader::new_at(data, start);
        let kind = r.read::<u16>()?;
        let flag = r.read::<u16>()?;
        let count = r.read::<u16>()?;
        let offsets = r.read_array16::<u16>(count)?;
        let mark_filtering_set = if flag & USE_MARK_FILTERING_SET != 0 {
            Some(r.read::<u16>()?)
        } else {
            None
        };

        Some(Self { data, start, kind, flag, offsets, mark_filtering_set })
    }

    /// The stored lookup type, which may be an Extension type.
    pub fn kind(&self) -> u16 {
        self.kind
    }

    /// The lookup flags.
    pub fn flag(&self) -> u16 {
        self.flag
    }

    /// The mark filtering set, if the flags say there is one.
    pub fn mark_filtering_set(&self) -> Option<u16> {
        self.mark_filtering_set
    }

    /// The number of subtables.
    pub fn subtable_count(&self) -> u16 {
        self.offsets.len()
    }

    /// The offset of a subtable from the start of the lookup, as stored.
    pub fn subtable_offset(&self, index: u16) -> Option<u16> {
        self.offsets.get(index)
    }

    /// A subtable, resolved through its Extension subtable if the lookup is
    /// an Extension lookup.
    pub fn subtable(&self, index: u16) -> Option<SubtableRef<'a>> {
        let pos = self.start + usize::from(self.offsets.get(index)?);
        if self.kind != GSUB_EXTENSION && self.kind != GPOS_EXTENSION {
            return Some(SubtableRef {
                kind: self.kind,
                data: self.data.get(pos..)?,
                extension: false,
            });
        }

        let mut r = Reader::new_at(self.data, pos);
        if r.read::<u16>()? != 1 {
            return None;
        }

        let kind = r.read::<u16>()?;
        let offset = r.read::<u32>()? as usize;
        Some(SubtableRef {
            kind,
            data: self.data.get(pos.checked_add(offset)?..)?,
            extension: true,
        })
    }
}

/// An encoded subtable.
#[derive(Debug, Copy, Clone)]
pub struct SubtableRef<'a> {
    /// The lookup type the subtable belongs to, after resolving extensions.
    pub kind: u16,
    /// The subtable data, running up to the end of the layout table.
    pub data: &'a [u8],
    /// Whether the subtable was reached through an Extension subtable.
    pub extension: bool,
}
