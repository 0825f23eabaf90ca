//! The dependency rules that keep derived tables consistent with edits.
//!
//! A commit first copies the edits into a [`WorkingSet`]. The [`RULES`] are
//! then applied in order, each one firing only if one of its trigger tables
//! is dirty, i.e. its encoded bytes differ from the base font. Rules either
//! recompute derived tables, which may make those dirty in turn, or validate
//! cross-table invariants. The order is a topological order of the rules:
//! no rule recomputes a table that an earlier rule is triggered by.
//!
//! Afterwards, [`stale_tables`] walks the table dependency graph to find
//! tables that depend on a dirty table but were neither edited nor touched
//! by any rule.

use crate::model::Edit;
use crate::table;
use crate::{
    Cmap, Error, Font, Glyf, Hdmx, Head, Hhea, Hmtx, Loca, Ltsh, Maxp, Os2, Post, Result,
    Table, TableBuilder, Tag, Vhea, Vmtx,
};
use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::borrow::Cow;

/// The edits of a commit plus everything the rules recompute.
pub(crate) struct WorkingSet<'a> {
    font: &'a Font<'a>,
    tables: FxHashMap<Tag, Edit>,
    edited: FxHashSet<Tag>,
    dirty: FxHashSet<Tag>,
    recomputed: FxHashSet<Tag>,
    validated: FxHashSet<Tag>,
}

impl<'a> WorkingSet<'a> {
    pub fn new(font: &'a Font<'a>, edits: &FxHashMap<Tag, Edit>) -> Self {
        let mut set = Self {
            font,
            tables: edits.clone(),
            edited: edits.keys().copied().collect(),
            dirty: FxHashSet::default(),
            recomputed: FxHashSet::default(),
            validated: FxHashSet::default(),
        };

        for &tag in edits.keys() {
            if set.differs_from_base(tag) {
                set.dirty.insert(tag);
            }
        }

        set
    }

    /// Whether the table was edited, including removal.
    pub fn is_edited(&self, tag: Tag) -> bool {
        self.edited.contains(&tag)
    }

    /// Whether the table's bytes differ from the base font.
    pub fn is_dirty(&self, tag: Tag) -> bool {
        self.dirty.contains(&tag)
    }

    /// Whether the table will be part of the output.
    pub fn contains(&self, tag: Tag) -> bool {
        match self.tables.get(&tag) {
            Some(Edit::Set { .. }) => true,
            Some(Edit::Removed) => false,
            None => self.font.contains(tag),
        }
    }

    /// Whether the table is present as opaque bytes that rules cannot look
    /// into.
    pub fn is_raw(&self, tag: Tag) -> bool {
        matches!(self.tables.get(&tag), Some(Edit::Set { builder, .. }) if builder.is_raw())
    }

    /// Whether the table was edited, removed, recomputed or validated.
    pub fn is_satisfied(&self, tag: Tag) -> bool {
        self.edited.contains(&tag)
            || self.recomputed.contains(&tag)
            || self.validated.contains(&tag)
    }

    /// The effective table: the builder if there is one, otherwise the table
    /// decoded from the base font.
    pub fn get<T: Table>(&self) -> Option<Cow<'_, T>> {
        match self.tables.get(&T::TAG) {
            Some(Edit::Set { builder, .. }) => T::from_builder(builder).map(Cow::Borrowed),
            Some(Edit::Removed) => None,
            None => T::read(self.font).map(Cow::Owned),
        }
    }

    /// The builder of a table, if it is structured.
    pub fn builder<T: Table>(&self) -> Option<&T> {
        match self.tables.get(&T::TAG)? {
            Edit::Set { builder, .. } => T::from_builder(builder),
            Edit::Removed => None,
        }
    }

    /// The builder of a table, decoding it from the base font first if
    /// necessary.
    pub fn get_mut<T: Table>(&mut self) -> Option<&mut T> {
        if !self.tables.contains_key(&T::TAG) {
            let builder = table::decode(self.font, T::TAG)?;
            self.tables.insert(T::TAG, Edit::Set { builder, linked: true });
        }

        match self.tables.get_mut(&T::TAG)? {
            Edit::Set { builder, .. } => T::from_builder_mut(builder),
            Edit::Removed => None,
        }
    }

    /// Replace a table with a freshly built one.
    pub fn put<T: Table>(&mut self, table: T) {
        self.tables.insert(T::TAG, Edit::Set { builder: table.into_builder(), linked: false });
    }

    /// The bytes of a table that is kept as is or was replaced by raw bytes.
    pub fn data(&self, tag: Tag) -> Option<&[u8]> {
        match self.tables.get(&tag) {
            Some(Edit::Set { builder: TableBuilder::Raw(data), .. }) => Some(data.as_slice()),
            Some(_) => None,
            None => self.font.table(tag),
        }
    }

    /// The glyph count of the working set, if `maxp` is readable.
    pub fn num_glyphs(&self) -> Option<u16> {
        self.get::<Maxp>().map(|maxp| maxp.num_glyphs)
    }

    /// Record that a rule recomputed a table.
    pub fn recomputed(&mut self, tag: Tag) {
        debug!("recomputed {tag} table");
        self.recomputed.insert(tag);
        if self.differs_from_base(tag) {
            self.dirty.insert(tag);
        }
    }

    /// Record that a rule checked a table against its dependencies.
    pub fn validated(&mut self, tag: Tag) {
        self.validated.insert(tag);
    }

    /// Encode all tables of the output.
    pub fn encode(&self) -> Result<Vec<(Tag, Cow<'a, [u8]>)>> {
        let mut tables = vec![];
        for tag in self.font.tags() {
            if self.tables.contains_key(&tag) {
                continue;
            }

            match self.font.table(tag) {
                Some(data) => tables.push((tag, Cow::Borrowed(data))),
                None => warn!("dropping {tag} table, which lies outside of the font"),
            }
        }

        for (&tag, edit) in &self.tables {
            if let Edit::Set { builder, .. } = edit {
                tables.push((tag, Cow::Owned(builder.write()?)));
            }
        }

        Ok(tables)
    }

    fn differs_from_base(&self, tag: Tag) -> bool {
        match self.tables.get(&tag) {
            Some(Edit::Set { builder, .. }) => match builder.write() {
                Ok(data) => self.font.table(tag) != Some(data.as_slice()),
                Err(_) => true,
            },
            Some(Edit::Removed) => self.font.contains(tag),
            None => false,
        }
    }
}

/// What a rule does with its target tables.
#[derive(Debug, Copy, Clone)]
pub(crate) enum Action {
    /// Rebuild the tables from their dependencies.
    Recompute(&'static [Tag]),
    /// Check the table against its dependencies.
    Validate(Tag),
}

impl Action {
    /// The tables the rule writes or checks.
    fn targets(&self) -> &[Tag] {
        match self {
            Action::Recompute(tags) => tags,
            Action::Validate(tag) => std::slice::from_ref(tag),
        }
    }
}

/// A dependency rule.
pub(crate) struct Rule {
    pub name: &'static str,
    /// The rule fires if any of these tables is dirty.
    pub triggers: &'static [Tag],
    pub action: Action,
    pub apply: fn(&mut WorkingSet) -> Result<()>,
}

/// All rules, in the order in which they are applied.
pub(crate) const RULES: &[Rule] = &[
    Rule {
        name: "glyph count and profile from glyf",
        triggers: &[Tag::GLYF],
        action: Action::Recompute(&[Tag::MAXP]),
        apply: maxp_from_glyf,
    },
    Rule {
        name: "non-empty font",
        triggers: &[Tag::MAXP],
        action: Action::Validate(Tag::MAXP),
        apply: check_glyph_count,
    },
    Rule {
        name: "horizontal metrics",
        triggers: &[Tag::MAXP, Tag::HHEA, Tag::HMTX],
        action: Action::Recompute(&[Tag::HMTX, Tag::HHEA]),
        apply: horizontal_metrics,
    },
    Rule {
        name: "vertical metrics",
        triggers: &[Tag::MAXP, Tag::VHEA, Tag::VMTX],
        action: Action::Recompute(&[Tag::VMTX, Tag::VHEA]),
        apply: vertical_metrics,
    },
    Rule {
        name: "average advance width",
        triggers: &[Tag::HMTX],
        action: Action::Recompute(&[Tag::OS2]),
        apply: average_char_width,
    },
    Rule {
        name: "hdmx glyph count",
        triggers: &[Tag::MAXP, Tag::HDMX],
        action: Action::Recompute(&[Tag::HDMX]),
        apply: hdmx_glyph_count,
    },
    Rule {
        name: "LTSH glyph count",
        triggers: &[Tag::MAXP, Tag::LTSH],
        action: Action::Recompute(&[Tag::LTSH]),
        apply: ltsh_glyph_count,
    },
    Rule {
        name: "loca from glyf",
        triggers: &[Tag::GLYF],
        action: Action::Recompute(&[Tag::LOCA, Tag::HEAD]),
        apply: loca_from_glyf,
    },
    Rule {
        name: "glyph count matches outlines",
        triggers: &[Tag::MAXP, Tag::GLYF, Tag::LOCA],
        action: Action::Validate(Tag::MAXP),
        apply: check_outline_count,
    },
    Rule {
        name: "cmap glyph range",
        triggers: &[Tag::MAXP, Tag::CMAP],
        action: Action::Validate(Tag::CMAP),
        apply: check_cmap,
    },
    Rule {
        name: "post glyph names",
        triggers: &[Tag::MAXP, Tag::POST],
        action: Action::Validate(Tag::POST),
        apply: check_post,
    },
];

/// Which tables have to be rebuilt when another table changes, as
/// `(dependent, dependency)`.
pub(crate) const EDGES: &[(Tag, Tag)] = &[
    (Tag::LOCA, Tag::GLYF),
    (Tag::HMTX, Tag::MAXP),
    (Tag::VMTX, Tag::MAXP),
    (Tag::HDMX, Tag::MAXP),
    (Tag::LTSH, Tag::MAXP),
    (Tag::POST, Tag::MAXP),
    (Tag::CMAP, Tag::MAXP),
    (Tag::GVAR, Tag::MAXP),
    (Tag::SBIX, Tag::MAXP),
    (Tag::ZAPF, Tag::MAXP),
    (Tag::GVAR, Tag::GLYF),
    (Tag::HMTX, Tag::HHEA),
    (Tag::VMTX, Tag::VHEA),
    (Tag::GVAR, Tag::FVAR),
    (Tag::CVAR, Tag::FVAR),
    (Tag::CVAR, Tag::CVT),
    (Tag::EBLC, Tag::EBDT),
    (Tag::CBLC, Tag::CBDT),
];

/// Apply all rules whose triggers are dirty.
pub(crate) fn apply(set: &mut WorkingSet) -> Result<()> {
    for rule in RULES {
        if rule.triggers.iter().any(|&tag| set.is_dirty(tag)) {
            debug!("applying rule '{}' to {:?}", rule.name, rule.action.targets());
            (rule.apply)(set)?;
        }
    }

    Ok(())
}

/// The tables of the output that depend on a dirty table, directly or
/// through other stale tables, but were not repaired. Sorted by tag.
pub(crate) fn stale_tables(set: &WorkingSet) -> Vec<Tag> {
    let mut dirty = set.dirty.clone();
    let mut stale = vec![];

    let mut progress = true;
    while progress {
        progress = false;
        for &(dependent, dependency) in EDGES {
            if dirty.contains(&dependency)
                && set.contains(dependent)
                && !set.is_satisfied(dependent)
                && dirty.insert(dependent)
            {
                stale.push(dependent);
                progress = true;
            }
        }
    }

    stale.sort();
    stale
}

fn overflow(tag: Tag, what: &str) -> Error {
    Error::Overflow { tag, what: what.into() }
}

fn maxp_from_glyf(set: &mut WorkingSet) -> Result<()> {
    if set.is_raw(Tag::MAXP) {
        warn!("maxp table is raw, it cannot be updated from glyf");
        return Ok(());
    }

    let (num_glyphs, profile) = {
        let Some(glyf) = set.builder::<Glyf>() else { return Ok(()) };
        let num_glyphs =
            u16::try_from(glyf.len()).map_err(|_| overflow(Tag::GLYF, "number of glyphs"))?;

        let Some(maxp) = set.get::<Maxp>() else {
            return Err(Error::MissingTable(Tag::MAXP));
        };

        if set.is_edited(Tag::MAXP) && maxp.num_glyphs != num_glyphs {
            return Err(Error::Inconsistent {
                tag: Tag::MAXP,
                reason: format!(
                    "numGlyphs is {}, but glyf has {num_glyphs} glyphs",
                    maxp.num_glyphs
                ),
            });
        }

        let mut profile = maxp.profile.clone();
        if let Some(profile) = &mut profile {
            if profile.update_from_glyf(glyf).is_none() {
                warn!("glyf table has malformed or cyclic glyphs, keeping the maxp profile");
            }
        }

        (num_glyphs, profile)
    };

    let Some(maxp) = set.get_mut::<Maxp>() else {
        return Err(Error::MissingTable(Tag::MAXP));
    };
    maxp.num_glyphs = num_glyphs;
    maxp.profile = profile;
    set.recomputed(Tag::MAXP);
    Ok(())
}

fn check_glyph_count(set: &mut WorkingSet) -> Result<()> {
    if set.num_glyphs() == Some(0) {
        return Err(Error::Inconsistent {
            tag: Tag::MAXP,
            reason: "the font must have at least one glyph".into(),
        });
    }

    set.validated(Tag::MAXP);
    Ok(())
}

fn horizontal_metrics(set: &mut WorkingSet) -> Result<()> {
    if !set.contains(Tag::HMTX) || set.is_raw(Tag::HMTX) || set.is_raw(Tag::HHEA) {
        return Ok(());
    }

    let Some(num_glyphs) = set.num_glyphs() else { return Ok(()) };
    if !set.contains(Tag::HHEA) {
        return Err(Error::MissingTable(Tag::HHEA));
    }

    let Some(hmtx) = set.get_mut::<Hmtx>() else {
        warn!("hmtx table is malformed, it cannot be resized");
        return Ok(());
    };
    hmtx.resize(num_glyphs);
    let long_metrics = hmtx.long_metrics();
    let max_advance = hmtx.max_advance();
    set.recomputed(Tag::HMTX);

    let Some(hhea) = set.get_mut::<Hhea>() else {
        return Err(Error::MissingTable(Tag::HHEA));
    };
    hhea.number_of_h_metrics = long_metrics;
    hhea.advance_width_max = max_advance;
    set.recomputed(Tag::HHEA);
    Ok(())
}

fn vertical_metrics(set: &mut WorkingSet) -> Result<()> {
    if !set.contains(Tag::VMTX) || set.is_raw(Tag::VMTX) || set.is_raw(Tag::VHEA) {
        return Ok(());
    }

    let Some(num_glyphs) = set.num_glyphs() else { return Ok(()) };
    if !set.contains(Tag::VHEA) {
        return Err(Error::MissingTable(Tag::VHEA));
    }

    let Some(vmtx) = set.get_mut::<Vmtx>() else {
        warn!("vmtx table is malformed, it cannot be resized");
        return Ok(());
    };
    vmtx.resize(num_glyphs);
    let long_metrics = vmtx.long_metrics();
    let max_advance = vmtx.max_advance();
    set.recomputed(Tag::VMTX);

    let Some(vhea) = set.get_mut::<Vhea>() else {
        return Err(Error::MissingTable(Tag::VHEA));
    };
    vhea.num_of_long_ver_metrics = long_metrics;
    vhea.advance_height_max = max_advance;
    set.recomputed(Tag::VHEA);
    Ok(())
}

fn average_char_width(set: &mut WorkingSet) -> Result<()> {
    if !set.contains(Tag::OS2) || set.is_raw(Tag::OS2) {
        return Ok(());
    }

    let Some(average) = set.get::<Hmtx>().map(|hmtx| hmtx.average_advance()) else {
        return Ok(());
    };

    let Some(os2) = set.get_mut::<Os2>() else {
        warn!("OS/2 table is malformed, xAvgCharWidth is not updated");
        return Ok(());
    };
    os2.x_avg_char_width = average;
    set.recomputed(Tag::OS2);
    Ok(())
}

fn hdmx_glyph_count(set: &mut WorkingSet) -> Result<()> {
    if !set.contains(Tag::HDMX) || set.is_raw(Tag::HDMX) {
        return Ok(());
    }

    let Some(num_glyphs) = set.num_glyphs() else { return Ok(()) };
    if set.is_edited(Tag::HDMX) {
        if let Some(hdmx) = set.builder::<Hdmx>() {
            if !hdmx.records.is_empty() && hdmx.num_glyphs() != Some(usize::from(num_glyphs))
            {
                return Err(Error::Inconsistent {
                    tag: Tag::HDMX,
                    reason: format!("device records must have {num_glyphs} widths each"),
                });
            }
        }
        set.validated(Tag::HDMX);
        return Ok(());
    }

    let Some(hdmx) = set.get_mut::<Hdmx>() else {
        warn!("hdmx table is malformed, it cannot be resized");
        return Ok(());
    };
    hdmx.resize(num_glyphs);
    set.recomputed(Tag::HDMX);
    Ok(())
}

fn ltsh_glyph_count(set: &mut WorkingSet) -> Result<()> {
    if !set.contains(Tag::LTSH) || set.is_raw(Tag::LTSH) {
        return Ok(());
    }

    let Some(num_glyphs) = set.num_glyphs() else { return Ok(()) };
    if set.is_edited(Tag::LTSH) {
        if let Some(ltsh) = set.builder::<Ltsh>() {
            if ltsh.y_pels.len() != usize::from(num_glyphs) {
                return Err(Error::Inconsistent {
                    tag: Tag::LTSH,
                    reason: format!(
                        "{} thresholds for {num_glyphs} glyphs",
                        ltsh.y_pels.len()
                    ),
                });
            }
        }
        set.validated(Tag::LTSH);
        return Ok(());
    }

    let Some(ltsh) = set.get_mut::<Ltsh>() else {
        warn!("LTSH table is malformed, it cannot be resized");
        return Ok(());
    };
    ltsh.resize(num_glyphs);
    set.recomputed(Tag::LTSH);
    Ok(())
}

fn loca_from_glyf(set: &mut WorkingSet) -> Result<()> {
    let loca = match set.builder::<Glyf>() {
        Some(glyf) => Loca::from_glyf(glyf)?,
        None => return Ok(()),
    };

    if set.is_raw(Tag::HEAD) {
        return Err(Error::Inconsistent {
            tag: Tag::HEAD,
            reason: "indexToLocFormat cannot be updated in a raw table".into(),
        });
    }

    let format = loca.format();
    let Some(head) = set.get_mut::<Head>() else {
        return Err(Error::MissingTable(Tag::HEAD));
    };
    head.index_to_loc_format = format;
    set.recomputed(Tag::HEAD);

    debug!("rebuilt loca with format {format}");
    set.put(loca);
    set.recomputed(Tag::LOCA);
    Ok(())
}

fn check_outline_count(set: &mut WorkingSet) -> Result<()> {
    if !set.contains(Tag::GLYF) || set.is_raw(Tag::MAXP) {
        return Ok(());
    }

    let Some(num_glyphs) = set.num_glyphs() else { return Ok(()) };
    let mismatch = |what: &str| Error::Inconsistent {
        tag: Tag::MAXP,
        reason: format!("numGlyphs is {num_glyphs}, but {what}"),
    };

    let outlines = match set.builder::<Glyf>() {
        Some(glyf) => Some(glyf.len()),
        None if !set.is_edited(Tag::GLYF) && !set.is_edited(Tag::LOCA) => {
            Maxp::read(set.font).map(|maxp| usize::from(maxp.num_glyphs))
        }
        None => None,
    };

    match outlines {
        Some(count) if count != usize::from(num_glyphs) => {
            return Err(mismatch(&format!("glyf has {count} glyphs")));
        }
        Some(_) => {}
        // Opaque glyph data: loca must at least be readable with the new
        // glyph count.
        None => {
            if let Some(loca) = set.builder::<Loca>() {
                let count = loca.offsets().len().saturating_sub(1);
                if count != usize::from(num_glyphs) {
                    return Err(mismatch(&format!("loca has {count} glyphs")));
                }
            } else if let Some(data) = set.data(Tag::LOCA) {
                let Some(head) = set.get::<Head>() else {
                    return Err(Error::MissingTable(Tag::HEAD));
                };
                if Loca::parse(data, head.index_to_loc_format, num_glyphs).is_none() {
                    return Err(mismatch("loca is too short for that many glyphs"));
                }
            }
        }
    }

    set.validated(Tag::MAXP);
    Ok(())
}

fn check_cmap(set: &mut WorkingSet) -> Result<()> {
    if !set.contains(Tag::CMAP) || set.is_raw(Tag::CMAP) {
        return Ok(());
    }

    let Some(num_glyphs) = set.num_glyphs() else { return Ok(()) };
    let Some(cmap) = set.get::<Cmap>() else {
        warn!("cmap table is malformed, its glyph ids cannot be checked");
        return Ok(());
    };

    if let Some((c, glyph, selector)) = cmap.find_glyph_at_or_above(num_glyphs) {
        let sequence = match selector {
            Some(selector) => format!("U+{c:04X} U+{selector:04X}"),
            None => format!("U+{c:04X}"),
        };
        return Err(Error::Inconsistent {
            tag: Tag::CMAP,
            reason: format!(
                "{sequence} maps to glyph {glyph}, but the font has {num_glyphs} glyphs"
            ),
        });
    }

    drop(cmap);
    set.validated(Tag::CMAP);
    Ok(())
}

fn check_post(set: &mut WorkingSet) -> Result<()> {
    if !set.contains(Tag::POST) || set.is_raw(Tag::POST) {
        return Ok(());
    }

    let Some(num_glyphs) = set.num_glyphs() else { return Ok(()) };
    let Some(post) = set.get::<Post>() else {
        warn!("post table is malformed, its glyph names cannot be checked");
        return Ok(());
    };

    if let Some(names) = &post.glyph_names {
        if names.indices.len() != usize::from(num_glyphs) {
            return Err(Error::Inconsistent {
                tag: Tag::POST,
                reason: format!(
                    "{} glyph names for {num_glyphs} glyphs",
                    names.indices.len()
                ),
            });
        }
    }

    drop(post);
    set.validated(Tag::POST);
    Ok(())
}
