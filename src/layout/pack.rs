//! Lays out a [`LayoutTable`] into bytes.
//!
//! The table is written in this order:
//!
//! - the header (with a FeatureVariations offset for version 1.1)
//! - the ScriptList with all scripts and language systems
//! - the FeatureList with all features
//! - the LookupList header followed by all Lookup tables
//! - the Extension subtables of promoted lookups
//! - the subtables of all other lookups
//! - the subtables of promoted lookups
//! - the FeatureVariations
//!
//! Every object starts at an even offset. Subtables are addressed with 16-bit
//! offsets from their lookup, so a lookup whose subtables end up too far away
//! is promoted: its type becomes the Extension type and each subtable is
//! reached through an 8-byte Extension subtable with a 32-bit offset.
//! Promotion can push the subtables of other lookups out of range, so the
//! layout is repeated until no more lookups overflow. The set of promoted
//! lookups only grows, hence there are at most as many rounds as lookups.

use super::{Feature, LangSys, LayoutTable, Lookup, Script};
use crate::write::{patch_u32, Writer};
use crate::{Error, Result, Tag};
use log::{info, trace};

const EXTENSION_LEN: usize = 8;

/// Encode a layout table with the given tag. `extension` is the Extension
/// lookup type of the table.
pub(crate) fn pack(table: &LayoutTable, tag: Tag, extension: u16) -> Result<Vec<u8>> {
    let ctx = Context { tag };
    ctx.count(table.lookups.len(), "number of lookups")?;
    ctx.count(table.features.len(), "number of features")?;
    ctx.count(table.scripts.len(), "number of scripts")?;

    let feature_map = ctx.sort_features(&table.features, table.lookups.len())?;
    let script_list = ctx.write_script_list(&table.scripts, &feature_map)?;
    let feature_list = ctx.write_feature_list(&table.features, &feature_map)?;
    let variations = table
        .variations
        .as_ref()
        .map(|v| v.write(tag, &feature_map, table.lookups.len()))
        .transpose()?;

    let header_len = if variations.is_some() { 14 } else { 10 };
    let script_list_pos = header_len;
    let feature_list_pos = align(script_list_pos + script_list.len());
    let lookup_list_pos = align(feature_list_pos + feature_list.len());

    let mut promoted = vec![false; table.lookups.len()];
    let mut placement = Placement::compute(&table.lookups, &promoted, lookup_list_pos);

    for round in 0..=table.lookups.len() {
        let overflowing = placement.overflowing(&promoted);
        trace!("{tag} layout round {round}: {} lookups overflow", overflowing.len());
        if overflowing.is_empty() {
            break;
        }

        for index in overflowing {
            let kind = table.lookups[index].kind;
            if kind == extension {
                return Err(ctx.overflow(format!(
                    "subtable offset of lookup {index}, which is already an extension lookup"
                )));
            }
            if !(1..=8).contains(&kind) {
                return Err(ctx.overflow(format!(
                    "subtable offset of lookup {index}, whose type {kind} cannot be \
                     wrapped in an extension"
                )));
            }
            trace!("{tag} promoting lookup {index} to extension");
            promoted[index] = true;
        }

        placement = Placement::compute(&table.lookups, &promoted, lookup_list_pos);
    }

    let num_promoted = promoted.iter().filter(|&&p| p).count();
    if num_promoted > 0 {
        info!("{tag}: promoted {num_promoted} of {} lookups to extension", promoted.len());
    }

    let mut w = Writer::with_capacity(placement.end);
    w.write::<u32>(if variations.is_some() { 0x00010001 } else { 0x00010000 });
    w.write::<u16>(ctx.offset16(script_list_pos, "script list offset")?);
    w.write::<u16>(ctx.offset16(feature_list_pos, "feature list offset")?);
    w.write::<u16>(ctx.offset16(lookup_list_pos, "lookup list offset")?);
    let variations_field = w.len();
    if variations.is_some() {
        w.write::<u32>(0);
    }

    w.pad_to(script_list_pos);
    w.extend(&script_list);
    w.pad_to(feature_list_pos);
    w.extend(&feature_list);
    w.pad_to(lookup_list_pos);

    placement.write(&mut w, &ctx, &table.lookups, &promoted, extension)?;

    let mut data = w.finish();
    if let Some(variations) = variations {
        let pos = align(data.len());
        let offset = u32::try_from(pos)
            .map_err(|_| ctx.overflow("feature variations offset".into()))?;
        data.resize(pos, 0);
        data.extend(variations);
        patch_u32(&mut data, variations_field, offset);
    }

    if u32::try_from(data.len()).is_err() {
        return Err(ctx.overflow("table length".into()));
    }

    Ok(data)
}

fn align(pos: usize) -> usize {
    (pos + 1) & !1
}

struct Context {
    tag: Tag,
}

impl Context {
    fn overflow(&self, what: String) -> Error {
        Error::Overflow { tag: self.tag, what }
    }

    fn inconsistent(&self, reason: String) -> Error {
        Error::Inconsistent { tag: self.tag, reason }
    }

    fn count(&self, len: usize, what: &str) -> Result<u16> {
        u16::try_from(len).map_err(|_| self.overflow(what.into()))
    }

    fn offset16(&self, offset: usize, what: &str) -> Result<u16> {
        u16::try_from(offset).map_err(|_| self.overflow(what.into()))
    }

    /// Sort the features by tag, keeping the order of equal tags. Returns the
    /// new index of each feature.
    fn sort_features(&self, features: &[Feature], num_lookups: usize) -> Result<Vec<u16>> {
        for feature in features {
            if let Some(&index) = feature.lookups.iter().find(|&&l| usize::from(l) >= num_lookups)
            {
                return Err(self.inconsistent(format!(
                    "feature {} refers to missing lookup {index}",
                    feature.tag
                )));
            }
        }

        let mut order = (0..features.len()).collect::<Vec<_>>();
        order.sort_by_key(|&i| features[i].tag);

        let mut map = vec![0; features.len()];
        for (new, &old) in order.iter().enumerate() {
            map[old] = new as u16;
        }

        Ok(map)
    }

    fn write_script_list(&self, scripts: &[Script], feature_map: &[u16]) -> Result<Vec<u8>> {
        let mut scripts = scripts.iter().collect::<Vec<_>>();
        scripts.sort_by_key(|s| s.tag);
        if let Some(pair) = scripts.windows(2).find(|pair| pair[0].tag == pair[1].tag) {
            return Err(self.inconsistent(format!("duplicate script {}", pair[0].tag)));
        }

        let header_len = 2 + scripts.len() * 6;
        let mut w = Writer::with_capacity(header_len);
        let mut tables = Writer::new();
        w.write::<u16>(self.count(scripts.len(), "number of scripts")?);

        for script in scripts {
            let offset = header_len + tables.len();
            w.write(script.tag);
            w.write::<u16>(self.offset16(offset, "script offset")?);
            tables.extend(&self.write_script(script, feature_map)?);
        }

        w.extend(&tables.finish());
        Ok(w.finish())
    }

    fn write_script(&self, script: &Script, feature_map: &[u16]) -> Result<Vec<u8>> {
        let mut lang_systems = script.lang_systems.iter().collect::<Vec<_>>();
        lang_systems.sort_by_key(|(tag, _)| *tag);
        if let Some(pair) = lang_systems.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(self.inconsistent(format!(
                "duplicate language system {} in script {}",
                pair[0].0, script.tag
            )));
        }

        let header_len = 4 + lang_systems.len() * 6;
        let mut tables = Writer::new();
        let mut w = Writer::with_capacity(header_len);

        match &script.default_lang_sys {
            Some(lang_sys) => {
                w.write::<u16>(self.offset16(header_len, "language system offset")?);
                self.write_lang_sys(&mut tables, lang_sys, feature_map)?;
            }
            None => w.write::<u16>(0),
        }

        w.write::<u16>(self.count(lang_systems.len(), "number of language systems")?);
        for (tag, lang_sys) in lang_systems {
            let offset = header_len + tables.len();
            w.write(*tag);
            w.write::<u16>(self.offset16(offset, "language system offset")?);
            self.write_lang_sys(&mut tables, lang_sys, feature_map)?;
        }

        w.extend(&tables.finish());
        Ok(w.finish())
    }

    fn write_lang_sys(
        &self,
        w: &mut Writer,
        lang_sys: &LangSys,
        feature_map: &[u16],
    ) -> Result<()> {
        let map = |index: u16| {
            feature_map.get(usize::from(index)).copied().ok_or_else(|| {
                self.inconsistent(format!("language system refers to missing feature {index}"))
            })
        };

        w.write::<u16>(0); // lookupOrderOffset
        w.write::<u16>(lang_sys.required_feature.map(map).transpose()?.unwrap_or(0xFFFF));
        w.write::<u16>(self.count(lang_sys.features.len(), "number of features")?);
        for &index in &lang_sys.features {
            w.write::<u16>(map(index)?);
        }

        Ok(())
    }

    fn write_feature_list(&self, features: &[Feature], feature_map: &[u16]) -> Result<Vec<u8>> {
        let mut sorted = vec![None; features.len()];
        for (feature, &index) in features.iter().zip(feature_map) {
            sorted[usize::from(index)] = Some(feature);
        }

        let header_len = 2 + features.len() * 6;
        let mut w = Writer::with_capacity(header_len);
        let mut tables = Writer::new();
        w.write::<u16>(self.count(features.len(), "number of features")?);

        for feature in sorted.into_iter().flatten() {
            let offset = header_len + tables.len();
            w.write(feature.tag);
            w.write::<u16>(self.offset16(offset, "feature offset")?);

            let mut lookups = Vec::with_capacity(feature.lookups.len());
            for &index in &feature.lookups {
                if !lookups.contains(&index) {
                    lookups.push(index);
                }
            }

            let params_offset = match &feature.params {
                Some(_) => self.offset16(4 + 2 * lookups.len(), "feature params offset")?,
                None => 0,
            };
            tables.write::<u16>(params_offset);
            tables.write::<u16>(self.count(lookups.len(), "number of lookups")?);
            tables.write(lookups.as_slice());
            if let Some(params) = &feature.params {
                tables.extend(params);
                tables.align(2);
            }
        }

        w.extend(&tables.finish());
        Ok(w.finish())
    }
}

/// The absolute positions of all lookups and subtables for one choice of
/// promoted lookups.
struct Placement {
    lookup_list: usize,
    lookups: Vec<usize>,
    extensions: Vec<Vec<usize>>,
    subtables: Vec<Vec<usize>>,
    end: usize,
}

impl Placement {
    fn compute(lookups: &[Lookup], promoted: &[bool], lookup_list: usize) -> Self {
        let mut pos = lookup_list + 2 + lookups.len() * 2;

        let mut lookup_pos = Vec::with_capacity(lookups.len());
        for lookup in lookups {
            lookup_pos.push(pos);
            pos += lookup_header_len(lookup);
        }

        let mut extensions = vec![vec![]; lookups.len()];
        for (i, lookup) in lookups.iter().enumerate().filter(|&(i, _)| promoted[i]) {
            for _ in &lookup.subtables {
                extensions[i].push(pos);
                pos += EXTENSION_LEN;
            }
        }

        let mut subtables = vec![vec![]; lookups.len()];
        let order = (0..lookups.len())
            .filter(|&i| !promoted[i])
            .chain((0..lookups.len()).filter(|&i| promoted[i]));
        for i in order {
            for subtable in &lookups[i].subtables {
                pos = align(pos);
                subtables[i].push(pos);
                pos += subtable.len();
            }
        }

        Self {
            lookup_list,
            lookups: lookup_pos,
            extensions,
            subtables,
            end: align(pos),
        }
    }

    /// The lookups that are not promoted, but have a subtable out of reach.
    fn overflowing(&self, promoted: &[bool]) -> Vec<usize> {
        (0..self.lookups.len())
            .filter(|&i| !promoted[i])
            .filter(|&i| {
                self.subtables[i]
                    .iter()
                    .any(|&pos| pos - self.lookups[i] > usize::from(u16::MAX))
            })
            .collect()
    }

    fn write(
        &self,
        w: &mut Writer,
        ctx: &Context,
        lookups: &[Lookup],
        promoted: &[bool],
        extension: u16,
    ) -> Result<()> {
        w.write::<u16>(ctx.count(lookups.len(), "number of lookups")?);
        for &pos in &self.lookups {
            w.write::<u16>(ctx.offset16(pos - self.lookup_list, "lookup offset")?);
        }

        for (i, lookup) in lookups.iter().enumerate() {
            let start = self.lookups[i];
            w.write::<u16>(if promoted[i] { extension } else { lookup.kind });
            w.write::<u16>(lookup.effective_flag());
            w.write::<u16>(ctx.count(lookup.subtables.len(), "number of subtables")?);

            let targets = if promoted[i] { &self.extensions[i] } else { &self.subtables[i] };
            for &pos in targets {
                w.write::<u16>(ctx.offset16(pos - start, "subtable offset")?);
            }

            if let Some(set) = lookup.mark_filtering_set {
                w.write::<u16>(set);
            }
        }

        for (i, lookup) in lookups.iter().enumerate().filter(|&(i, _)| promoted[i]) {
            for (&ext, &pos) in self.extensions[i].iter().zip(&self.subtables[i]) {
                w.pad_to(ext);
                w.write::<u16>(1);
                w.write::<u16>(lookup.kind);
                w.write::<u32>(
                    u32::try_from(pos - ext)
                        .map_err(|_| ctx.overflow("extension offset".into()))?,
                );
            }
        }

        let order = (0..lookups.len())
            .filter(|&i| !promoted[i])
            .chain((0..lookups.len()).filter(|&i| promoted[i]));
        for i in order {
            for (subtable, &pos) in lookups[i].subtables.iter().zip(&self.subtables[i]) {
                w.pad_to(pos);
                w.extend(subtable);
            }
        }

        w.pad_to(self.end);
        Ok(())
    }
}

fn lookup_header_len(lookup: &Lookup) -> usize {
    6 + lookup.subtables.len() * 2 + if lookup.mark_filtering_set.is_some() { 2 } else { 0 }
}
