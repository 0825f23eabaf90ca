//! The `maxp` table holds the number of glyphs and, for TrueType outlines,
//! the maximum profile that fonts use to allocate memory. The profile fields
//! that depend on glyph outlines are recalculated whenever `glyf` is edited.

use crate::glyf::{Glyf, GlyphHeader};
use crate::read::Reader;
use crate::table::{builder_conversions, Table};
use crate::write::Writer;
use crate::{Font, Result, Tag};

const VERSION_0_5: u32 = 0x00005000;
const VERSION_1_0: u32 = 0x00010000;

/// The maximum profile table.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Maxp {
    /// The number of glyphs in the font.
    pub num_glyphs: u16,
    /// The version 1.0 profile. `None` for version 0.5 tables, as used by
    /// fonts with CFF outlines.
    pub profile: Option<MaxpProfile>,
}

/// The fields of a version 1.0 `maxp` table.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
#[allow(missing_docs)]
pub struct MaxpProfile {
    pub max_points: u16,
    pub max_contours: u16,
    pub max_composite_points: u16,
    pub max_composite_contours: u16,
    pub max_zones: u16,
    pub max_twilight_points: u16,
    pub max_storage: u16,
    pub max_function_defs: u16,
    pub max_instruction_defs: u16,
    pub max_stack_elements: u16,
    pub max_size_of_instructions: u16,
    pub max_component_elements: u16,
    pub max_component_depth: u16,
}

impl Maxp {
    /// Parse the table from its bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut r = Reader::new(data);
        let version = r.read::<u32>()?;
        let num_glyphs = r.read::<u16>()?;
        let profile = match version {
            VERSION_0_5 => None,
            VERSION_1_0 => Some(MaxpProfile {
                max_points: r.read()?,
                max_contours: r.read()?,
                max_composite_points: r.read()?,
                max_composite_contours: r.read()?,
                max_zones: r.read()?,
                max_twilight_points: r.read()?,
                max_storage: r.read()?,
                max_function_defs: r.read()?,
                max_instruction_defs: r.read()?,
                max_stack_elements: r.read()?,
                max_size_of_instructions: r.read()?,
                max_component_elements: r.read()?,
                max_component_depth: r.read()?,
            }),
            _ => return None,
        };

        Some(Maxp { num_glyphs, profile })
    }
}

impl Table for Maxp {
    const TAG: Tag = Tag::MAXP;

    fn read(font: &Font) -> Option<Self> {
        Self::parse(font.table(Self::TAG)?)
    }

    fn write(&self) -> Result<Vec<u8>> {
        let mut w = Writer::with_capacity(32);
        match &self.profile {
            None => {
                w.write::<u32>(VERSION_0_5);
                w.write::<u16>(self.num_glyphs);
            }
            Some(p) => {
                w.write::<u32>(VERSION_1_0);
                w.write::<u16>(self.num_glyphs);
                w.write::<[u16; 13]>([
                    p.max_points,
                    p.max_contours,
                    p.max_composite_points,
                    p.max_composite_contours,
                    p.max_zones,
                    p.max_twilight_points,
                    p.max_storage,
                    p.max_function_defs,
                    p.max_instruction_defs,
                    p.max_stack_elements,
                    p.max_size_of_instructions,
                    p.max_component_elements,
                    p.max_component_depth,
                ]);
            }
        }
        Ok(w.finish())
    }

    builder_conversions!(Maxp);
}

/// Per-glyph totals, with composite glyphs expanded.
#[derive(Debug, Default, Copy, Clone)]
struct GlyphStats {
    points: u16,
    contours: u16,
    depth: u16,
}

#[derive(Copy, Clone)]
enum Visit {
    New,
    Active,
    Done(GlyphStats),
}

impl MaxpProfile {
    /// Recalculate the fields that depend on the glyph outlines.
    ///
    /// The hinting related fields (zones, storage, function definitions and
    /// so on) are kept. Returns `None` if a glyph is malformed or composite
    /// glyphs reference each other in a cycle.
    pub fn update_from_glyf(&mut self, glyf: &Glyf) -> Option<()> {
        let mut state = vec![Visit::New; glyf.len()];

        let mut max_points = 0;
        let mut max_contours = 0;
        let mut max_composite_points = 0;
        let mut max_composite_contours = 0;
        let mut max_size_of_instructions = 0;
        let mut max_component_elements = 0;
        let mut max_component_depth = 0;

        for (id, data) in glyf.glyphs().iter().enumerate() {
            let Some(header) = GlyphHeader::parse(data)? else { continue };
            max_size_of_instructions =
                max_size_of_instructions.max(header.instructions_len(data)?);

            let stats = visit(glyf, id as u16, &mut state)?;
            if header.is_composite() {
                max_composite_points = max_composite_points.max(stats.points);
                max_composite_contours = max_composite_contours.max(stats.contours);
                max_component_depth = max_component_depth.max(stats.depth);
                let elements = header.components(data).count() as u16;
                max_component_elements = max_component_elements.max(elements);
            } else {
                max_points = max_points.max(stats.points);
                max_contours = max_contours.max(stats.contours);
            }
        }

        self.max_points = max_points;
        self.max_contours = max_contours;
        self.max_composite_points = max_composite_points;
        self.max_composite_contours = max_composite_contours;
        self.max_size_of_instructions = max_size_of_instructions;
        self.max_component_elements = max_component_elements;
        self.max_component_depth = max_component_depth;
        Some(())
    }
}

fn visit(glyf: &Glyf, id: u16, state: &mut [Visit]) -> Option<GlyphStats> {
    match *state.get(usize::from(id))? {
        Visit::Done(stats) => return Some(stats),
        // Cycle.
        Visit::Active => return None,
        Visit::New => {}
    }

    state[usize::from(id)] = Visit::Active;
    let data = glyf.glyph(id)?;
    let stats = match GlyphHeader::parse(data)? {
        None => GlyphStats::default(),
        Some(header) if !header.is_composite() => GlyphStats {
            points: header.simple_points(data)?,
            contours: header.number_of_contours as u16,
            depth: 0,
        },
        Some(header) => {
            let mut total = GlyphStats::default();
            let mut child_depth = 0;
            for component in header.components(data) {
                let child = visit(glyf, component?, state)?;
                total.points = total.points.saturating_add(child.points);
                total.contours = total.contours.saturating_add(child.contours);
                child_depth = child_depth.max(child.depth);
            }
            total.depth = child_depth.saturating_add(1);
            total
        }
    };

    state[usize::from(id)] = Visit::Done(stats);
    Some(stats)
}
