use std::env;
use fontedit::{CommitOptions, Font, FontModel, TableOrder, Tag};

fn parse_tags(tags: &str) -> Vec<Tag> {
    tags.split(',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut tag = [b' '; 4];
            for (dst, src) in tag.iter_mut().zip(s.bytes()) {
                *dst = src;
            }
            Tag(tag)
        })
        .collect()
}

// Note that this is more of an experimental CLI used for testing.
//
// Usage: cli <input> [output] [index] [tables to remove, comma separated]
fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data = std::fs::read(&args[1]).unwrap();
    let index = args.get(3).map_or(0, |i| i.parse::<u32>().unwrap());
    let font = Font::new(&data, index).unwrap();

    let options = CommitOptions { table_order: TableOrder::Recommended, ..Default::default() };
    let mut model = FontModel::new(font).with_options(options);
    for tag in parse_tags(args.get(4).map_or("", String::as_str)) {
        model.remove(tag);
    }

    let out = model.commit().unwrap();
    std::fs::write(args.get(2).unwrap_or(&"res.ttf".to_owned()), out).unwrap();
}
