use crate::{init_logger, padded_outline, Result, TestFont};
use fontedit::{
    checksum, Cmap, Collection, CommitOptions, Error, Font, FontModel, Glyf, Head, Hhea, Hmtx,
    Loca, Maxp, Os2, Post, Table, TableOrder, Tag,
};
use ttf_parser::GlyphId;

const CHECKSUM_MAGIC: u32 = 0xB1B0AFBA;

#[test]
fn no_edits_round_trip() -> Result<()> {
    init_logger();
    let data = TestFont::new(&[500, 600, 700]).build();
    let model = FontModel::new(Font::new(&data, 0)?);

    let out = model.commit()?;
    assert_eq!(out, data);
    assert_eq!(checksum(&out), CHECKSUM_MAGIC);

    // Committing again, and committing the output, changes nothing.
    assert_eq!(model.commit()?, out);
    let again = FontModel::new(Font::new(&out, 0)?).commit()?;
    assert_eq!(again, out);
    Ok(())
}

#[test]
fn unchanged_linked_edits_round_trip() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.edit::<Maxp>().unwrap();
    model.edit::<Hmtx>().unwrap();
    model.edit::<Glyf>().unwrap();
    model.edit::<Cmap>().unwrap();
    assert!(model.is_linked(Tag::GLYF));
    assert_eq!(model.commit()?, data);
    Ok(())
}

#[test]
fn glyph_count_propagates_to_metrics() -> Result<()> {
    init_logger();
    let data = TestFont::new(&[500, 600, 700]).without_outlines().build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.edit::<Maxp>().unwrap().num_glyphs = 5;

    let out = model.commit()?;
    let font = Font::new(&out, 0)?;
    let hmtx = Hmtx::read(&font).unwrap();
    let advances = hmtx.metrics.iter().map(|m| m.advance).collect::<Vec<_>>();
    assert_eq!(advances, vec![500, 600, 700, 700, 700]);

    let hhea = Hhea::read(&font).unwrap();
    assert_eq!(hhea.number_of_h_metrics, 3);
    assert_eq!(hhea.advance_width_max, 700);
    assert_eq!(Os2::read(&font).unwrap().x_avg_char_width, 640);
    assert_eq!(checksum(&out), CHECKSUM_MAGIC);

    let face = ttf_parser::Face::parse(&out, 0)?;
    assert_eq!(face.number_of_glyphs(), 5);
    assert_eq!(face.glyph_hor_advance(GlyphId(4)), Some(700));
    assert_eq!(face.glyph_hor_side_bearing(GlyphId(4)), Some(0));
    assert_eq!(face.glyph_index('B'), Some(GlyphId(2)));
    Ok(())
}

#[test]
fn new_glyphs_propagate_through_maxp() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    let glyf = model.edit::<Glyf>().unwrap();
    glyf.glyphs_mut().push(padded_outline(40));
    glyf.glyphs_mut().push(vec![]);

    let out = model.commit()?;
    let font = Font::new(&out, 0)?;
    let maxp = Maxp::read(&font).unwrap();
    assert_eq!(maxp.num_glyphs, 5);
    assert_eq!(maxp.profile.as_ref().unwrap().max_points, 4);
    assert_eq!(maxp.profile.as_ref().unwrap().max_zones, 1);
    assert_eq!(Os2::read(&font).unwrap().x_avg_char_width, 640);
    assert_eq!(Loca::read(&font).unwrap().offsets(), &[0, 0, 34, 34, 74, 74]);

    let face = ttf_parser::Face::parse(&out, 0)?;
    assert_eq!(face.number_of_glyphs(), 5);
    assert_eq!(face.glyph_hor_advance(GlyphId(3)), Some(700));
    assert!(face.glyph_bounding_box(GlyphId(3)).is_some());
    Ok(())
}

#[test]
fn fractional_average_is_truncated() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.edit::<Hmtx>().unwrap().metrics[0].advance = 501;

    let out = model.commit()?;
    let font = Font::new(&out, 0)?;
    // 1801 / 3 = 600.33
    assert_eq!(Os2::read(&font).unwrap().x_avg_char_width, 600);
    Ok(())
}

#[test]
fn explicit_maxp_must_agree_with_glyf() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.edit::<Glyf>().unwrap().glyphs_mut().push(vec![]);
    model.edit::<Maxp>().unwrap().num_glyphs = 6;

    match model.commit() {
        Err(Error::Inconsistent { tag, reason }) => {
            assert_eq!(tag, Tag::MAXP);
            assert!(reason.contains("4 glyphs"));
        }
        other => panic!("unexpected result: {other:?}"),
    }

    model.edit::<Maxp>().unwrap().num_glyphs = 4;
    assert_eq!(Maxp::read(&Font::new(&model.commit()?, 0)?).unwrap().num_glyphs, 4);
    Ok(())
}

#[test]
fn maxp_alone_cannot_change_glyph_count_of_outlines() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).build();
    for num_glyphs in [2, 5] {
        let mut model = FontModel::new(Font::new(&data, 0)?);
        model.edit::<Maxp>().unwrap().num_glyphs = num_glyphs;
        match model.commit() {
            Err(Error::Inconsistent { tag, reason }) => {
                assert_eq!(tag, Tag::MAXP);
                assert!(reason.contains("glyf has 3 glyphs"), "{reason}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    // With raw glyph data, loca has to cover the new glyph count.
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.set_raw(Tag::GLYF, vec![0; 64]);
    model.set_raw(Tag::LOCA, vec![0, 0, 0, 0, 0, 32, 0, 32]);
    model.edit::<Maxp>().unwrap().num_glyphs = 4;
    assert!(matches!(
        model.commit(),
        Err(Error::Inconsistent { tag: Tag::MAXP, reason }) if reason.contains("loca")
    ));

    model.set_raw(Tag::LOCA, vec![0, 0, 0, 0, 0, 16, 0, 32, 0, 32]);
    let out = model.commit()?;
    let face = ttf_parser::Face::parse(&out, 0)?;
    assert_eq!(face.number_of_glyphs(), 4);
    Ok(())
}

fn loca_format_for(len: usize) -> Result<(i16, u32)> {
    let data = TestFont::new(&[500, 600, 700]).build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    let glyf = model.edit::<Glyf>().unwrap();
    glyf.set_glyph(1, padded_outline(0x10000));
    glyf.set_glyph(2, padded_outline(len - 0x10000));

    let out = model.commit()?;
    let font = Font::new(&out, 0)?;
    let format = Head::read(&font).unwrap().index_to_loc_format;
    let loca = Loca::read(&font).unwrap();
    assert_eq!(font.table(Tag::GLYF).unwrap().len(), len);
    assert_eq!(loca.offsets().last().copied(), Some(len as u32));

    let face = ttf_parser::Face::parse(&out, 0)?;
    assert!(face.glyph_bounding_box(GlyphId(2)).is_some());
    Ok((format, font.record(Tag::LOCA).unwrap().length))
}

#[test]
fn loca_format_fits_glyf_length() -> Result<()> {
    assert_eq!(loca_format_for(0x1FFFE)?, (0, 8));
    assert_eq!(loca_format_for(0x20000)?, (1, 16));

    // The format is chosen again on every commit, so shrinking the glyph
    // data goes back to short offsets.
    let data = TestFont::new(&[500, 600, 700]).build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.edit::<Glyf>().unwrap().set_glyph(1, padded_outline(0x20000));
    let long = model.commit()?;

    let mut model = FontModel::new(Font::new(&long, 0)?);
    model.edit::<Glyf>().unwrap().set_glyph(1, padded_outline(64));
    let short = model.commit()?;
    assert_eq!(Head::read(&Font::new(&short, 0)?).unwrap().index_to_loc_format, 0);
    Ok(())
}

#[test]
fn raw_glyf_leaves_loca_stale() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.set_raw(Tag::GLYF, vec![0; 64]);

    let err = model.commit().unwrap_err();
    assert_eq!(err, Error::StaleTables(vec![Tag::LOCA]));
    assert!(err.to_string().contains("loca"));

    model.options_mut().allow_stale = true;
    let out = model.commit()?;
    assert_eq!(Font::new(&out, 0)?.table(Tag::GLYF), Some(&[0; 64][..]));
    Ok(())
}

#[test]
fn raw_glyf_with_raw_loca_is_accepted() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.set_raw(Tag::GLYF, vec![0; 64]);
    model.set_raw(Tag::LOCA, vec![0, 0, 0, 0, 0, 32, 0, 32]);
    assert!(model.commit().is_ok());
    Ok(())
}

#[test]
fn variation_tables_go_stale() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).with_table(Tag::GVAR, vec![0; 20]).build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.edit::<Glyf>().unwrap().set_glyph(0, padded_outline(34));
    assert_eq!(model.commit(), Err(Error::StaleTables(vec![Tag::GVAR])));

    model.remove(Tag::GVAR);
    let out = model.commit()?;
    assert!(!Font::new(&out, 0)?.contains(Tag::GVAR));
    Ok(())
}

#[test]
fn cmap_must_map_to_existing_glyphs() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.edit::<Cmap>().unwrap().insert('C' as u32, 7);

    match model.commit() {
        Err(Error::Inconsistent { tag, reason }) => {
            assert_eq!(tag, Tag::CMAP);
            assert!(reason.contains("U+0043"), "{reason}");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    // Nothing was written, the model can be fixed and committed again.
    model.edit::<Cmap>().unwrap().insert('C' as u32, 2);
    let out = model.commit()?;
    let face = ttf_parser::Face::parse(&out, 0)?;
    assert_eq!(face.glyph_index('C'), Some(GlyphId(2)));
    Ok(())
}

#[test]
fn fewer_glyphs_orphan_cmap_mappings() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.edit::<Glyf>().unwrap().glyphs_mut().truncate(2);
    assert!(matches!(model.commit(), Err(Error::Inconsistent { tag: Tag::CMAP, .. })));

    model.edit::<Cmap>().unwrap().remove('B' as u32);
    let out = model.commit()?;
    let font = Font::new(&out, 0)?;
    assert_eq!(Hmtx::read(&font).unwrap().metrics.len(), 2);
    Ok(())
}

#[test]
fn post_names_must_match_glyph_count() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).with_glyph_names().build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.edit::<Glyf>().unwrap().glyphs_mut().push(vec![]);
    assert!(matches!(model.commit(), Err(Error::Inconsistent { tag: Tag::POST, .. })));

    let post = model.edit::<Post>().unwrap();
    post.glyph_names.as_mut().unwrap().push(b"extra");
    let out = model.commit()?;

    let face = ttf_parser::Face::parse(&out, 0)?;
    assert_eq!(face.glyph_name(GlyphId(3)), Some("extra"));
    assert_eq!(face.glyph_name(GlyphId(1)), Some("glyph1"));
    Ok(())
}

#[test]
fn missing_hhea_is_reported() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).without_outlines().build();
    let mut model = FontModel::new(Font::new(&data, 0)?);
    model.remove(Tag::HHEA);
    model.edit::<Maxp>().unwrap().num_glyphs = 4;
    assert_eq!(model.commit(), Err(Error::MissingTable(Tag::HHEA)));
    Ok(())
}

#[test]
fn recommended_order_keeps_directory_sorted() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).build();
    let options = CommitOptions { table_order: TableOrder::Recommended, ..Default::default() };
    let out = FontModel::new(Font::new(&data, 0)?).with_options(options).commit()?;

    let font = Font::new(&out, 0)?;
    let tags = font.records().iter().map(|r| r.tag).collect::<Vec<_>>();
    let mut sorted = tags.clone();
    sorted.sort();
    assert_eq!(tags, sorted);

    // head comes first in the file.
    let head = font.record(Tag::HEAD).unwrap().offset;
    assert!(font.records().iter().all(|r| r.offset >= head));
    assert_eq!(checksum(&out), CHECKSUM_MAGIC);

    // Only the checksum adjustment in head depends on the layout.
    let base = Font::new(&data, 0)?;
    for record in font.records().iter().filter(|r| r.tag != Tag::HEAD) {
        assert_eq!(font.table(record.tag), base.table(record.tag));
    }
    Ok(())
}

#[test]
fn checksum_adjustment_can_be_disabled() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).build();
    let options = CommitOptions { checksum_adjustment: false, ..Default::default() };
    let out = FontModel::new(Font::new(&data, 0)?).with_options(options).commit()?;
    let font = Font::new(&out, 0)?;
    assert_eq!(Head::read(&font).unwrap().checksum_adjustment, 0);
    Ok(())
}

/// Put two fonts into a collection. The second font shares all tables of the
/// first one except for `OS/2`.
fn collection(data: &[u8]) -> Result<Vec<u8>> {
    let font = Font::new(data, 0)?;
    let first = font.records().to_vec();
    let second = first.iter().copied().filter(|r| r.tag != Tag::OS2).collect::<Vec<_>>();

    let dir1 = 20;
    let dir2 = dir1 + 12 + 16 * first.len();
    let base = dir2 + 12 + 16 * second.len();

    let mut out = vec![];
    out.extend(b"ttcf");
    out.extend([0, 1, 0, 0]);
    out.extend(2u32.to_be_bytes());
    out.extend((dir1 as u32).to_be_bytes());
    out.extend((dir2 as u32).to_be_bytes());
    for records in [&first, &second] {
        out.extend(font.sfnt_version().to_be_bytes());
        out.extend((records.len() as u16).to_be_bytes());
        out.extend([0; 6]);
        for record in records.iter() {
            out.extend(record.tag.0);
            out.extend(record.checksum.to_be_bytes());
            out.extend((record.offset + base as u32).to_be_bytes());
            out.extend(record.length.to_be_bytes());
        }
    }
    out.extend(data);
    Ok(out)
}

#[test]
fn collection_members_can_be_edited() -> Result<()> {
    let data = TestFont::new(&[500, 600, 700]).build();
    let ttc = collection(&data)?;

    let collection = Collection::parse(&ttc)?;
    assert_eq!(collection.len(), 2);
    assert_eq!(collection.fonts().count(), 2);
    let shared = collection.shared_tables();
    assert_eq!(shared.len(), Font::new(&data, 0)?.records().len());

    let second = Font::new(&ttc, 1)?;
    assert!(!second.contains(Tag::OS2));
    let mut model = FontModel::new(second);
    model.edit::<Glyf>().unwrap().glyphs_mut().push(vec![]);

    let out = model.commit()?;
    assert_eq!(checksum(&out), CHECKSUM_MAGIC);
    let font = Font::new(&out, 0)?;
    assert_eq!(Hmtx::read(&font).unwrap().metrics.len(), 4);
    assert!(!font.contains(Tag::OS2));
    assert_eq!(font.table(Tag::CMAP), Font::new(&data, 0)?.table(Tag::CMAP));
    Ok(())
}
