//! FeatureVariations select alternate features in regions of the design
//! space of a variable font. All offsets inside the structure are 32-bit.

use crate::read::{Readable, Reader};
use crate::write::{patch_u32, Writeable, Writer};
use crate::{Error, Result, Tag};

/// A signed 2.14 fixed-point number, as used for normalized axis
/// coordinates.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct F2Dot14(pub i16);

impl F2Dot14 {
    /// Convert from a float, clamping to the representable range.
    pub fn from_f32(value: f32) -> Self {
        let scaled = (value * 16384.0).round();
        Self(scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16)
    }

    /// Convert to a float.
    pub fn to_f32(self) -> f32 {
        f32::from(self.0) / 16384.0
    }
}

impl Readable<'_> for F2Dot14 {
    const SIZE: usize = 2;

    fn read(r: &mut Reader) -> Option<Self> {
        r.read::<i16>().map(Self)
    }
}

impl Writeable for F2Dot14 {
    fn write(&self, w: &mut Writer) {
        w.write::<i16>(self.0)
    }
}

/// The FeatureVariations of a layout table.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct FeatureVariations {
    /// The records, evaluated in order. The first record whose conditions
    /// all hold is applied.
    pub records: Vec<FeatureVariationRecord>,
}

/// A set of conditions and the feature substitutions applied when all of
/// them hold.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct FeatureVariationRecord {
    /// The conditions, all of which must hold.
    pub conditions: Vec<Condition>,
    /// The alternate features.
    pub substitutions: Vec<FeatureSubstitution>,
}

/// A range on one axis of the design space, in normalized coordinates.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Condition {
    /// The index of the axis in `fvar`.
    pub axis_index: u16,
    /// The inclusive minimum.
    pub min: F2Dot14,
    /// The inclusive maximum.
    pub max: F2Dot14,
}

/// Replaces the lookups of one feature.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FeatureSubstitution {
    /// The index of the feature in [`LayoutTable::features`](super::LayoutTable::features).
    pub feature_index: u16,
    /// The lookups of the alternate feature.
    pub lookups: Vec<u16>,
}

impl FeatureVariations {
    /// Encode the structure. Feature indices are mapped through
    /// `feature_map`, which gives the written index of each feature.
    pub(crate) fn write(
        &self,
        tag: Tag,
        feature_map: &[u16],
        num_lookups: usize,
    ) -> Result<Vec<u8>> {
        let overflow = |what: &str| Error::Overflow { tag, what: what.into() };
        let count = u32::try_from(self.records.len())
            .map_err(|_| overflow("number of feature variation records"))?;

        let mut w = Writer::new();
        w.write::<u16>(1);
        w.write::<u16>(0);
        w.write::<u32>(count);

        let records_start = w.len();
        w.pad_to(records_start + self.records.len() * 8);

        let mut offsets = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let condition_set = offset32(w.len(), &overflow)?;
            write_condition_set(&mut w, &record.conditions, &overflow)?;

            let substitutions = offset32(w.len(), &overflow)?;
            write_substitutions(
                &mut w,
                &record.substitutions,
                tag,
                feature_map,
                num_lookups,
                &overflow,
            )?;

            offsets.push((condition_set, substitutions));
        }

        let mut data = w.finish();
        for (i, (condition_set, substitutions)) in offsets.into_iter().enumerate() {
            patch_u32(&mut data, records_start + i * 8, condition_set);
            patch_u32(&mut data, records_start + i * 8 + 4, substitutions);
        }

        Ok(data)
    }
}

fn offset32(pos: usize, overflow: &impl Fn(&str) -> Error) -> Result<u32> {
    u32::try_from(pos).map_err(|_| overflow("feature variations offset"))
}

fn write_condition_set(
    w: &mut Writer,
    conditions: &[Condition],
    overflow: &impl Fn(&str) -> Error,
) -> Result<()> {
    let count =
        u16::try_from(conditions.len()).map_err(|_| overflow("number of conditions"))?;
    w.write::<u16>(count);

    // Conditions follow the offset array directly, 8 bytes each.
    let mut offset = 2 + conditions.len() * 4;
    for _ in conditions {
        w.write::<u32>(offset32(offset, overflow)?);
        offset += 8;
    }

    for condition in conditions {
        w.write::<u16>(1);
        w.write::<u16>(condition.axis_index);
        w.write(condition.min);
        w.write(condition.max);
    }

    Ok(())
}

fn write_substitutions(
    w: &mut Writer,
    substitutions: &[FeatureSubstitution],
    tag: Tag,
    feature_map: &[u16],
    num_lookups: usize,
    overflow: &impl Fn(&str) -> Error,
) -> Result<()> {
    let count = u16::try_from(substitutions.len())
        .map_err(|_| overflow("number of feature substitutions"))?;

    let mut remapped = Vec::with_capacity(substitutions.len());
    for substitution in substitutions {
        let Some(&index) = feature_map.get(usize::from(substitution.feature_index)) else {
            return Err(Error::Inconsistent {
                tag,
                reason: format!(
                    "feature variation refers to missing feature {}",
                    substitution.feature_index
                ),
            });
        };
        if let Some(&lookup) =
            substitution.lookups.iter().find(|&&l| usize::from(l) >= num_lookups)
        {
            return Err(Error::Inconsistent {
                tag,
                reason: format!("feature variation refers to missing lookup {lookup}"),
            });
        }
        remapped.push((index, substitution));
    }

    // Substitution records must be sorted by feature index.
    remapped.sort_by_key(|&(index, _)| index);
    if remapped.windows(2).any(|pair| pair[0].0 == pair[1].0) {
        return Err(Error::Inconsistent {
            tag,
            reason: "feature is substituted twice in one feature variation".into(),
        });
    }

    w.write::<u16>(1);
    w.write::<u16>(0);
    w.write::<u16>(count);

    let mut offset = 6 + remapped.len() * 6;
    for (index, substitution) in &remapped {
        w.write::<u16>(*index);
        w.write::<u32>(offset32(offset, overflow)?);
        offset += 4 + substitution.lookups.len() * 2;
    }

    for (_, substitution) in &remapped {
        let lookups = u16::try_from(substitution.lookups.len())
            .map_err(|_| overflow("number of lookups in feature"))?;
        w.write::<u16>(0);
        w.write::<u16>(lookups);
        w.write(substitution.lookups.as_slice());
    }

    Ok(())
}
