use crate::{MediaItem, MediaKind, TeamInfo};

/// Team whose `team_id()` is `"School_1_A_{stove}"`.
pub fn team_info(stove: &str) -> TeamInfo {
    TeamInfo {
        school: "School".to_string(),
        grade: "1".to_string(),
        class_name: "A".to_string(),
        stove_number: stove.to_string(),
        member_count: 3,
        member_names: vec!["Ana".to_string(), "Bo".to_string(), "Cy".to_string()],
    }
}

/// Photo reference, not backed by a file.
pub fn photo(name: &str) -> MediaItem {
    MediaItem::new(format!("/nonexistent/{name}"), MediaKind::Photo)
}

/// Video reference, not backed by a file.
pub fn video(name: &str) -> MediaItem {
    MediaItem::new(format!("/nonexistent/{name}"), MediaKind::Video)
}

/// Media item backed by a real file inside `dir`.
pub fn media_file(dir: &std::path::Path, name: &str, kind: MediaKind) -> MediaItem {
    let path = dir.join(name);
    // Fixture: failing here means the temp dir is unusable, so panic.
    std::fs::write(&path, name.as_bytes()).expect("write media fixture");
    MediaItem::new(path.to_string_lossy(), kind)
}
