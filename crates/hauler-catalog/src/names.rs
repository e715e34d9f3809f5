use crate::item::Item;

const MAX_FILE_NAME_CHARS: usize = 150;
const DEFAULT_EXTENSION: &str = ".zip";

/// Replace filesystem-hostile characters and collapse whitespace.
pub fn sanitize(part: &str) -> String {
    let replaced: String = part
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic local file name for an item's artifact.
///
/// `{id}_{title}_{developer}{ext}`, with the extension taken from the
/// suggested name when one was advertised. Names over the cap shorten the
/// title first and drop the developer only as a last resort; the id
/// prefix keeps the path unique per item either way.
pub fn artifact_file_name(item: &Item, suggested_name: Option<&str>) -> String {
    let extension = suggested_name
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext))
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    let title = sanitize(&item.title);
    let developer = sanitize(&item.developer);

    let full = format!("{}_{title}_{developer}{extension}", item.id);
    if full.chars().count() <= MAX_FILE_NAME_CHARS {
        return full;
    }

    let fixed = format!("{}__{developer}{extension}", item.id).chars().count();
    let title_room = MAX_FILE_NAME_CHARS.saturating_sub(fixed + 10);
    if title_room > 10 {
        let short: String = title.chars().take(title_room).collect();
        format!("{}_{short}_{developer}{extension}", item.id)
    } else {
        let fallback = format!("{}_{title}{extension}", item.id);
        fallback.chars().take(MAX_FILE_NAME_CHARS).collect()
    }
}
