//! The edit session.

use crate::rules::{self, WorkingSet};
use crate::table;
use crate::{CommitOptions, Error, Font, Result, SfntWriter, Table, TableBuilder, Tag};
use log::{debug, warn};
use rustc_hash::FxHashMap;
use std::borrow::Cow;

/// An edit of one table.
#[derive(Debug, Clone)]
pub(crate) enum Edit {
    /// The table is replaced by a builder.
    Set {
        builder: TableBuilder,
        /// Whether the builder was decoded from the base font.
        linked: bool,
    },
    /// The table is removed from the font.
    Removed,
}

/// Edits to a font that are written out together.
///
/// The model only stores the tables that were edited. All other tables are
/// taken from the base font when the model is committed, unless a dependency
/// rule has to recompute them.
///
/// Committing does not consume or modify the model. If a commit fails, the
/// edits can be fixed and the commit retried.
#[derive(Debug, Clone)]
pub struct FontModel<'a> {
    font: Font<'a>,
    options: CommitOptions,
    edits: FxHashMap<Tag, Edit>,
}

impl<'a> FontModel<'a> {
    /// Start editing a font.
    pub fn new(font: Font<'a>) -> Self {
        Self { font, options: CommitOptions::default(), edits: FxHashMap::default() }
    }

    /// Use different options for committing.
    pub fn with_options(mut self, options: CommitOptions) -> Self {
        self.options = options;
        self
    }

    /// The options for committing.
    pub fn options(&self) -> &CommitOptions {
        &self.options
    }

    /// Mutable access to the options for committing.
    pub fn options_mut(&mut self) -> &mut CommitOptions {
        &mut self.options
    }

    /// The font that is being edited.
    pub fn base(&self) -> &Font<'a> {
        &self.font
    }

    /// Replace a table, or add it if the font doesn't have it yet.
    pub fn set<T: Table>(&mut self, table: T) {
        self.edits
            .insert(T::TAG, Edit::Set { builder: table.into_builder(), linked: false });
    }

    /// Replace a table with opaque bytes.
    ///
    /// Dependency rules cannot look into raw tables. If other tables depend on
    /// this one, they have to be edited as well, otherwise the commit fails.
    pub fn set_raw(&mut self, tag: Tag, data: Vec<u8>) {
        self.edits
            .insert(tag, Edit::Set { builder: TableBuilder::Raw(data), linked: false });
    }

    /// Remove a table from the font.
    pub fn remove(&mut self, tag: Tag) {
        self.edits.insert(tag, Edit::Removed);
    }

    /// Drop all edits of a table.
    pub fn revert(&mut self, tag: Tag) {
        self.edits.remove(&tag);
    }

    /// Edit a table in place.
    ///
    /// On first access, the table is decoded from the base font. Returns
    /// `None` if the table is missing, malformed, removed or was replaced by
    /// raw bytes.
    pub fn edit<T: Table>(&mut self) -> Option<&mut T> {
        if !self.edits.contains_key(&T::TAG) {
            let builder = table::decode(&self.font, T::TAG)?;
            self.edits.insert(T::TAG, Edit::Set { builder, linked: true });
        }

        match self.edits.get_mut(&T::TAG)? {
            Edit::Set { builder, .. } => T::from_builder_mut(builder),
            Edit::Removed => None,
        }
    }

    /// The current state of a table: the edited version if there is one,
    /// otherwise the one decoded from the base font.
    ///
    /// Tables that dependency rules would recompute are returned as they are
    /// before the commit.
    pub fn get<T: Table>(&self) -> Option<Cow<'_, T>> {
        match self.edits.get(&T::TAG) {
            Some(Edit::Set { builder, .. }) => T::from_builder(builder).map(Cow::Borrowed),
            Some(Edit::Removed) => None,
            None => T::read(&self.font).map(Cow::Owned),
        }
    }

    /// Whether the font contains a table after the edits.
    pub fn contains(&self, tag: Tag) -> bool {
        match self.edits.get(&tag) {
            Some(Edit::Set { .. }) => true,
            Some(Edit::Removed) => false,
            None => self.font.contains(tag),
        }
    }

    /// Whether a table was edited, replaced or removed.
    pub fn is_edited(&self, tag: Tag) -> bool {
        self.edits.contains_key(&tag)
    }

    /// Whether a table is being edited in a builder that was decoded from the
    /// base font.
    pub fn is_linked(&self, tag: Tag) -> bool {
        matches!(self.edits.get(&tag), Some(Edit::Set { linked: true, .. }))
    }

    /// Apply the dependency rules and write the font.
    ///
    /// Fails without side effects if an edit violates a cross-table
    /// invariant or leaves a dependent table stale.
    pub fn commit(&self) -> Result<Vec<u8>> {
        debug!("committing {} edited tables", self.edits.len());

        let mut set = WorkingSet::new(&self.font, &self.edits);
        rules::apply(&mut set)?;

        let stale = rules::stale_tables(&set);
        if !stale.is_empty() {
            if !self.options.allow_stale {
                return Err(Error::StaleTables(stale));
            }
            warn!("writing stale tables: {stale:?}");
        }

        let mut writer = SfntWriter::new(self.font.sfnt_version());
        for (tag, data) in set.encode()? {
            writer.push(tag, data);
        }

        writer.finish(&self.options)
    }
}
