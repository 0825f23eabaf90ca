use fontedit::{
    Cmap, CmapSubtable, CommitOptions, EncodingRecord, Format4, Glyf, GlyphNames, Head,
    Hhea, Hmtx, Loca, Maxp, MaxpProfile, Metric, Os2, Post, SfntWriter, Table, Tag,
};
use std::error::Error;

mod commit;
mod layout;

type Result<T> = std::result::Result<T, Box<dyn Error>>;

/// Describes a small synthetic TrueType font.
struct TestFont {
    advances: Vec<u16>,
    /// Whether the font has `glyf` and `loca` tables.
    outlines: bool,
    /// Whether `post` is a version 2.0 table with glyph names.
    glyph_names: bool,
    /// Characters mapped to glyphs in a format 4 subtable.
    mappings: Vec<(char, u16)>,
    extra: Vec<(Tag, Vec<u8>)>,
}

impl TestFont {
    fn new(advances: &[u16]) -> Self {
        Self {
            advances: advances.to_vec(),
            outlines: true,
            glyph_names: false,
            mappings: vec![('A', 1), ('B', 2)],
            extra: vec![],
        }
    }

    fn without_outlines(mut self) -> Self {
        self.outlines = false;
        self
    }

    fn with_glyph_names(mut self) -> Self {
        self.glyph_names = true;
        self
    }

    fn with_table(mut self, tag: Tag, data: Vec<u8>) -> Self {
        self.extra.push((tag, data));
        self
    }

    fn build(&self) -> Vec<u8> {
        let num_glyphs = self.advances.len() as u16;
        let hmtx = Hmtx {
            metrics: self
                .advances
                .iter()
                .map(|&advance| Metric { advance, side_bearing: 50 })
                .collect(),
        };

        let glyf = Glyf::new((0..num_glyphs).map(|i| outline(i % 2 == 1)).collect());
        let loca = Loca::from_glyf(&glyf).unwrap();
        let head = Head { index_to_loc_format: loca.format(), ..Head::default() };

        let mut profile = MaxpProfile { max_zones: 1, ..MaxpProfile::default() };
        profile.update_from_glyf(&glyf).unwrap();
        let maxp = Maxp { num_glyphs, profile: Some(profile) };

        let hhea = Hhea {
            version: 0x00010000,
            ascender: 800,
            descender: -200,
            line_gap: 0,
            advance_width_max: hmtx.max_advance(),
            min_left_side_bearing: 50,
            min_right_side_bearing: 0,
            x_max_extent: 0,
            caret_slope_rise: 1,
            caret_slope_run: 0,
            caret_offset: 0,
            metric_data_format: 0,
            number_of_h_metrics: hmtx.long_metrics(),
        };

        let os2 =
            Os2 { version: 0, x_avg_char_width: hmtx.average_advance(), rest: vec![0; 74] };

        let mut header = [0; 32];
        let post = if self.glyph_names {
            header[0..4].copy_from_slice(&[0, 2, 0, 0]);
            let mut names = GlyphNames::default();
            names.indices.push(0);
            for i in 1..num_glyphs {
                names.push(format!("glyph{i}").as_bytes());
            }
            Post { header, glyph_names: Some(names), rest: vec![] }
        } else {
            header[0..4].copy_from_slice(&[0, 3, 0, 0]);
            Post { header, glyph_names: None, rest: vec![] }
        };

        let mut format4 = Format4::default();
        for &(c, glyph) in &self.mappings {
            format4.mappings.insert(c as u16, glyph);
        }
        let cmap = Cmap {
            records: vec![EncodingRecord {
                platform_id: 3,
                encoding_id: 1,
                subtable: CmapSubtable::Format4(format4),
            }],
        };

        let mut writer = SfntWriter::new(0x00010000);
        writer.push(Tag::HEAD, head.write().unwrap());
        writer.push(Tag::HHEA, hhea.write().unwrap());
        writer.push(Tag::MAXP, maxp.write().unwrap());
        writer.push(Tag::OS2, os2.write().unwrap());
        writer.push(Tag::HMTX, hmtx.write().unwrap());
        writer.push(Tag::POST, post.write().unwrap());
        writer.push(Tag::CMAP, cmap.write().unwrap());
        if self.outlines {
            writer.push(Tag::GLYF, glyf.write().unwrap());
            writer.push(Tag::LOCA, loca.write().unwrap());
        }
        for (tag, data) in &self.extra {
            writer.push(*tag, data.clone());
        }

        writer.finish(&CommitOptions::default()).unwrap()
    }
}

/// A square outline, or no outline at all.
fn outline(square: bool) -> Vec<u8> {
    if !square {
        return vec![];
    }

    let mut data = vec![];
    data.extend(1i16.to_be_bytes()); // numberOfContours
    for v in [0i16, 0, 100, 100] {
        data.extend(v.to_be_bytes());
    }
    data.extend(3u16.to_be_bytes()); // endPtsOfContours
    data.extend(0u16.to_be_bytes()); // instructionLength
    data.extend([0x01; 4]); // flags: on curve, 16-bit coordinates
    for dx in [0i16, 0, 100, 0] {
        data.extend(dx.to_be_bytes());
    }
    for dy in [0i16, 100, 0, -100] {
        data.extend(dy.to_be_bytes());
    }
    data
}

/// An outline padded with zeros to exactly `len` bytes.
fn padded_outline(len: usize) -> Vec<u8> {
    let mut data = outline(true);
    data.resize(len, 0);
    data
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
