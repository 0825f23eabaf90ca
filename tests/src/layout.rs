use crate::{Result, TestFont};
use fontedit::layout::{
    Condition, F2Dot14, FeatureSubstitution, FeatureVariationRecord, FeatureVariations,
    LangSys, LayoutTableRef, Lookup, GPOS_EXTENSION, GSUB_EXTENSION,
};
use fontedit::{Error, Font, FontModel, Gpos, Gsub, LayoutTable, Table, Tag};
use ttf_parser::gsub::{SingleSubstitution, SubstitutionSubtable};
use ttf_parser::GlyphId;

const LATN: Tag = Tag(*b"latn");
const CYRL: Tag = Tag(*b"cyrl");
const LIGA: Tag = Tag(*b"liga");
const CALT: Tag = Tag(*b"calt");
const CV01: Tag = Tag(*b"cv01");
const SS01: Tag = Tag(*b"ss01");

/// A single substitution subtable that adds `delta` to glyph 1, padded with
/// zeros to `len` bytes.
fn single_subst(delta: i16, len: usize) -> Vec<u8> {
    let mut data = vec![];
    data.extend(1u16.to_be_bytes()); // format
    data.extend(6u16.to_be_bytes()); // coverage offset
    data.extend(delta.to_be_bytes());
    data.extend([0, 1, 0, 1, 0, 1]); // coverage format 1 with glyph 1
    data.resize(len, 0);
    data
}

fn lang_sys(feature: u16) -> LangSys {
    LangSys { required_feature: None, features: vec![feature] }
}

fn u16_at(data: &[u8], pos: usize) -> u16 {
    u16::from_be_bytes([data[pos], data[pos + 1]])
}

fn u32_at(data: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// One script, one feature and one lookup with three large subtables.
fn large_gsub() -> Gsub {
    let mut gsub = Gsub::default();
    let subtables = [5, 10, 15].map(|delta| single_subst(delta, 40000)).to_vec();
    let lookup = gsub.push_lookup(Lookup::new(1, subtables)) as u16;
    let feature = gsub.push_feature(LIGA, vec![lookup]) as u16;
    gsub.script_mut(LATN).default_lang_sys = Some(lang_sys(feature));
    gsub
}

#[test]
fn far_subtables_are_reached_through_extensions() -> Result<()> {
    let data = large_gsub().write()?;
    assert_eq!(u16_at(&data, 4), 10);
    assert_eq!(u16_at(&data, 6), 30);
    assert_eq!(u16_at(&data, 8), 44);

    let table = LayoutTableRef::parse(&data).ok_or("malformed GSUB")?;
    assert_eq!(table.version(), 0x00010000);
    let lookup = table.lookup(0).ok_or("missing lookup")?;
    assert_eq!(lookup.kind(), GSUB_EXTENSION);
    assert_eq!(u16_at(&data, 44 + 2), 4);

    let offsets = (0..3).map(|i| lookup.subtable_offset(i)).collect::<Option<Vec<_>>>();
    assert_eq!(offsets, Some(vec![12, 20, 28]));

    for (i, ext_offset) in [24, 40016, 80008].into_iter().enumerate() {
        let ext = 48 + usize::from(offsets.as_ref().unwrap()[i]);
        assert_eq!(u16_at(&data, ext), 1);
        assert_eq!(u16_at(&data, ext + 2), 1);
        assert_eq!(u32_at(&data, ext + 4), ext_offset);

        let subtable = lookup.subtable(i as u16).ok_or("missing subtable")?;
        assert!(subtable.extension);
        assert_eq!(subtable.kind, 1);
        let expected = single_subst(5 * (i as i16 + 1), 40000);
        assert_eq!(&subtable.data[..40000], expected.as_slice());
    }

    Ok(())
}

#[test]
fn extension_lookups_are_readable_by_ttf_parser() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.set(large_gsub());
    let out = model.commit()?;

    let face = ttf_parser::Face::parse(&out, 0)?;
    let gsub = face.tables().gsub.as_ref().ok_or("no GSUB table")?;
    let lookup = gsub.lookups.get(0).ok_or("no lookup")?;
    for (i, expected) in [5, 10, 15].into_iter().enumerate() {
        match lookup.subtables.get::<SubstitutionSubtable>(i as u16) {
            Some(SubstitutionSubtable::Single(SingleSubstitution::Format1 {
                coverage,
                delta,
            })) => {
                assert_eq!(delta, expected);
                assert!(coverage.contains(GlyphId(1)));
                assert!(!coverage.contains(GlyphId(2)));
            }
            _ => panic!("subtable {i} is not a single substitution"),
        }
    }

    Ok(())
}

#[test]
fn promotion_cascades() -> Result<()> {
    let mut gsub = Gsub::default();
    gsub.push_lookup(Lookup::new(1, vec![single_subst(1, 65510), single_subst(2, 10)]));
    gsub.push_lookup(Lookup::new(1, vec![single_subst(3, 70000), single_subst(4, 10)]));
    let data = gsub.write()?;

    // Promoting the second lookup pushes the subtables of the first one out
    // of reach, so both end up as extension lookups.
    let table = LayoutTableRef::parse(&data).ok_or("malformed GSUB")?;
    let first = table.lookup(0).ok_or("missing lookup")?;
    let second = table.lookup(1).ok_or("missing lookup")?;
    assert_eq!(u16_at(&data, 14 + 2), 6);
    assert_eq!(u16_at(&data, 14 + 4), 16);
    assert_eq!(first.kind(), GSUB_EXTENSION);
    assert_eq!(second.kind(), GSUB_EXTENSION);
    assert_eq!((first.subtable_offset(0), first.subtable_offset(1)), (Some(20), Some(28)));
    assert_eq!((second.subtable_offset(0), second.subtable_offset(1)), (Some(26), Some(34)));

    // Subtables of promoted lookups keep the lookup order.
    assert_eq!(u32_at(&data, 40 + 4), 32);
    assert_eq!(u32_at(&data, 56 + 4), 65536);
    for (lookup, deltas) in [(&first, [1, 2]), (&second, [3, 4])] {
        for (i, delta) in deltas.into_iter().enumerate() {
            let subtable = lookup.subtable(i as u16).ok_or("missing subtable")?;
            assert_eq!(subtable.kind, 1);
            assert_eq!(&subtable.data[..6], &single_subst(delta, 6)[..]);
        }
    }

    Ok(())
}

#[test]
fn features_are_sorted_and_remapped() -> Result<()> {
    let mut gsub = Gsub::default();
    let first = gsub.push_lookup(Lookup::new(1, vec![single_subst(1, 12)])) as u16;
    let second = gsub.push_lookup(Lookup::new(1, vec![single_subst(2, 12)])) as u16;
    let liga = gsub.push_feature(LIGA, vec![second]) as u16;
    let calt = gsub.push_feature(CALT, vec![first]) as u16;
    let liga2 = gsub.push_feature(LIGA, vec![first, second]) as u16;

    let latn = gsub.script_mut(LATN);
    latn.default_lang_sys =
        Some(LangSys { required_feature: Some(liga2), features: vec![liga, calt, liga2] });
    latn.lang_systems.push((Tag(*b"TRK "), lang_sys(calt)));
    latn.lang_systems.push((Tag(*b"DEU "), lang_sys(liga)));
    gsub.script_mut(CYRL).default_lang_sys = None;

    let data = gsub.write()?;
    let table = LayoutTableRef::parse(&data).ok_or("malformed GSUB")?;
    assert_eq!(table.script_tags(), Some(vec![CYRL, LATN]));
    assert_eq!(table.feature_tags(), Some(vec![CALT, LIGA, LIGA]));
    assert_eq!(table.feature_lookups(0), Some(vec![first]));
    assert_eq!(table.feature_lookups(1), Some(vec![second]));
    assert_eq!(table.feature_lookups(2), Some(vec![first, second]));

    assert_eq!(table.lang_sys_features(LATN, None), Some(vec![2, 1, 0, 2]));
    assert_eq!(table.lang_sys_features(LATN, Some(Tag(*b"DEU "))), Some(vec![1]));
    assert_eq!(table.lang_sys_features(LATN, Some(Tag(*b"TRK "))), Some(vec![0]));
    assert_eq!(table.lang_sys_features(CYRL, None), None);
    Ok(())
}

#[test]
fn duplicate_scripts_are_rejected() {
    let mut gsub = Gsub::default();
    gsub.script_mut(LATN);
    let script = gsub.scripts[0].clone();
    gsub.scripts.push(script);
    assert!(matches!(gsub.write(), Err(Error::Inconsistent { tag: Tag::GSUB, .. })));

    let mut gsub = Gsub::default();
    let latn = gsub.script_mut(LATN);
    latn.lang_systems.push((Tag(*b"DEU "), LangSys::default()));
    latn.lang_systems.push((Tag(*b"DEU "), LangSys::default()));
    assert!(matches!(gsub.write(), Err(Error::Inconsistent { .. })));
}

#[test]
fn feature_variations_follow_remapping() -> Result<()> {
    let mut gsub = Gsub::default();
    let lookup = gsub.push_lookup(Lookup::new(1, vec![single_subst(1, 12)])) as u16;
    let alternate = gsub.push_lookup(Lookup::new(1, vec![single_subst(2, 12)])) as u16;
    let liga = gsub.push_feature(LIGA, vec![lookup]) as u16;
    gsub.push_feature(CALT, vec![]);
    gsub.variations = Some(FeatureVariations {
        records: vec![FeatureVariationRecord {
            conditions: vec![Condition {
                axis_index: 0,
                min: F2Dot14::from_f32(0.5),
                max: F2Dot14::from_f32(1.0),
            }],
            substitutions: vec![FeatureSubstitution {
                feature_index: liga,
                lookups: vec![alternate],
            }],
        }],
    });

    let data = gsub.write()?;
    let table = LayoutTableRef::parse(&data).ok_or("malformed GSUB")?;
    assert_eq!(table.version(), 0x00010001);
    assert_eq!(u16_at(&data, 4), 14);

    let offset = u32_at(&data, 10) as usize;
    assert_eq!(offset % 2, 0);
    let variations = table.variations().ok_or("missing feature variations")?;
    assert_eq!(variations.len(), data.len() - offset);
    assert_eq!(u32_at(variations, 4), 1);

    let conditions = u32_at(variations, 8) as usize;
    let condition = conditions + u32_at(variations, conditions + 2) as usize;
    assert_eq!(u16_at(variations, condition + 4), 0x2000);
    assert_eq!(u16_at(variations, condition + 6), 0x4000);

    // liga is written after calt.
    let substitutions = u32_at(variations, 12) as usize;
    assert_eq!(u16_at(variations, substitutions + 4), 1);
    assert_eq!(u16_at(variations, substitutions + 6), 1);
    let feature = substitutions + u32_at(variations, substitutions + 8) as usize;
    assert_eq!(u16_at(variations, feature + 2), 1);
    assert_eq!(u16_at(variations, feature + 4), alternate);

    gsub.variations.as_mut().unwrap().records[0].substitutions[0].feature_index = 5;
    assert!(matches!(gsub.write(), Err(Error::Inconsistent { .. })));
    Ok(())
}

#[test]
fn extension_lookups_cannot_be_promoted() {
    let mut gsub = Gsub::default();
    gsub.push_lookup(Lookup::new(GSUB_EXTENSION, vec![vec![0; 70000], vec![0; 8]]));
    assert!(matches!(gsub.write(), Err(Error::Overflow { tag: Tag::GSUB, .. })));
}

#[test]
fn mark_filtering_set_survives_promotion() -> Result<()> {
    let mut gpos = Gpos::default();
    let mut small = Lookup::new(4, vec![vec![0, 1, 0, 0]]);
    small.mark_filtering_set = Some(1);
    gpos.push_lookup(small);
    let mut large = Lookup::new(2, vec![vec![0; 70000], vec![0, 1, 0, 0]]);
    large.flag = 0x0008;
    large.mark_filtering_set = Some(3);
    gpos.push_lookup(large);

    let data = gpos.write()?;
    let table = LayoutTableRef::parse(&data).ok_or("malformed GPOS")?;

    let small = table.lookup(0).ok_or("missing lookup")?;
    assert_eq!(small.kind(), 4);
    assert_eq!(small.flag(), 0x0010);
    assert_eq!(small.mark_filtering_set(), Some(1));
    assert_eq!(small.subtable_offset(0), Some(10));
    let subtable = small.subtable(0).ok_or("missing subtable")?;
    assert!(!subtable.extension);
    assert_eq!(&subtable.data[..4], &[0, 1, 0, 0]);

    let promoted = table.lookup(1).ok_or("missing lookup")?;
    assert_eq!(promoted.kind(), GPOS_EXTENSION);
    assert_eq!(promoted.flag(), 0x0018);
    assert_eq!(promoted.mark_filtering_set(), Some(3));
    assert_eq!(promoted.subtable_count(), 2);
    let first = promoted.subtable(0).ok_or("missing subtable")?;
    assert!(first.extension);
    assert_eq!(first.kind, 2);
    assert_eq!(first.data.len(), 70004);
    let second = promoted.subtable(1).ok_or("missing subtable")?;
    assert_eq!(second.data, &[0, 1, 0, 0]);
    Ok(())
}

#[test]
fn base_layout_tables_are_replaced_not_edited() -> Result<()> {
    let gsub = LayoutTable::new();
    let data = TestFont::new(&[500, 600, 700])
        .with_table(Tag::GSUB, Gsub(gsub).write()?)
        .build();

    let mut model = FontModel::new(Font::new(&data, 0)?);
    assert!(model.edit::<Gsub>().is_none());
    assert!(model.get::<Gsub>().is_none());
    assert!(LayoutTableRef::parse(model.base().table(Tag::GSUB).unwrap()).is_some());

    model.set(large_gsub());
    assert_eq!(model.get::<Gsub>().map(|gsub| gsub.lookups.len()), Some(1));
    model.edit::<Gsub>().unwrap().script_mut(CYRL);

    let out = model.commit()?;
    let font = Font::new(&out, 0)?;
    let table = LayoutTableRef::parse(font.table(Tag::GSUB).unwrap()).unwrap();
    assert_eq!(table.script_tags(), Some(vec![CYRL, LATN]));
    Ok(())
}

#[test]
fn feature_params_follow_lookup_indices() -> Result<()> {
    let cv01_params = vec![0, 0, 1, 0, 1, 1, 1, 2, 0, 0, 0, 0, 0, 0];
    let mut gsub = Gsub::default();
    let lookup = gsub.push_lookup(Lookup::new(1, vec![single_subst(1, 12)])) as u16;
    let ss01 = gsub.push_feature(SS01, vec![lookup, lookup]);
    gsub.features[ss01].params = Some(vec![0, 0, 1, 3]);
    gsub.push_feature(LIGA, vec![lookup]);
    let cv01 = gsub.push_feature(CV01, vec![]);
    gsub.features[cv01].params = Some(cv01_params.clone());

    let data = TestFont::new(&[500, 600, 700]).build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.set(gsub);
    let out = model.commit()?;
    let font = Font::new(&out, 0)?;
    let data = font.table(Tag::GSUB).ok_or("no GSUB table")?;

    let table = LayoutTableRef::parse(data).ok_or("malformed GSUB")?;
    assert_eq!(table.feature_tags(), Some(vec![CV01, LIGA, SS01]));
    assert_eq!(table.feature_params(1), None);
    assert_eq!(table.feature_lookups(2), Some(vec![lookup]));

    let params = table.feature_params(0).ok_or("missing cv01 params")?;
    assert_eq!(&params[..14], cv01_params.as_slice());
    let params = table.feature_params(2).ok_or("missing ss01 params")?;
    assert_eq!(&params[..4], &[0, 0, 1, 3]);

    // The params start right after the single lookup index.
    let feature_list = usize::from(u16_at(data, 6));
    let feature = feature_list + usize::from(u16_at(data, feature_list + 2 + 2 * 6 + 4));
    assert_eq!(u16_at(data, feature), 6);
    assert_eq!(u16_at(data, feature + 2), 1);

    let face = ttf_parser::Face::parse(&out, 0)?;
    assert_eq!(face.tables().gsub.as_ref().map(|gsub| gsub.features.len()), Some(3));
    Ok(())
}

#[test]
fn only_wrappable_lookup_types_are_promoted() -> Result<()> {
    let subtables = || [1, 2, 3].map(|delta| single_subst(delta, 40000)).to_vec();

    for kind in [0, 9] {
        let mut gsub = Gsub::default();
        gsub.push_lookup(Lookup::new(kind, subtables()));
        match gsub.write() {
            Err(Error::Overflow { tag, what }) => {
                assert_eq!(tag, Tag::GSUB);
                assert!(what.contains(&format!("type {kind}")), "{what}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    let mut gpos = Gpos::default();
    gpos.push_lookup(Lookup::new(10, subtables()));
    assert!(matches!(gpos.write(), Err(Error::Overflow { tag: Tag::GPOS, .. })));

    // Reverse chaining substitutions can be wrapped.
    let mut gsub = Gsub::default();
    gsub.push_lookup(Lookup::new(8, subtables()));
    let data = gsub.write()?;
    let table = LayoutTableRef::parse(&data).ok_or("malformed GSUB")?;
    let lookup = table.lookup(0).ok_or("missing lookup")?;
    assert_eq!(lookup.kind(), GSUB_EXTENSION);
    assert_eq!(lookup.subtable(2).ok_or("missing subtable")?.kind, 8);
    Ok(())
}

#[test]
fn empty_lookups_are_kept_next_to_promoted_ones() -> Result<()> {
    let mut gsub = large_gsub();
    gsub.lookups.insert(0, Lookup::new(4, vec![]));
    gsub.features[0].lookups = vec![1];
    gsub.push_lookup(Lookup::new(1, vec![]));

    let data = gsub.write()?;
    let table = LayoutTableRef::parse(&data).ok_or("malformed GSUB")?;
    assert_eq!(table.lookup_count(), Some(3));

    for (index, kind) in [(0, 4), (2, 1)] {
        let lookup = table.lookup(index).ok_or("missing lookup")?;
        assert_eq!(lookup.kind(), kind);
        assert_eq!(lookup.subtable_count(), 0);
        assert!(lookup.subtable(0).is_none());
    }

    let promoted = table.lookup(1).ok_or("missing lookup")?;
    assert_eq!(promoted.kind(), GSUB_EXTENSION);
    assert_eq!(promoted.subtable_count(), 3);
    let subtable = promoted.subtable(0).ok_or("missing subtable")?;
    assert_eq!(&subtable.data[..6], &single_subst(5, 6)[..]);
    Ok(())
}
