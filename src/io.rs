use std::path::{Path, PathBuf};

/// Longest title fragment kept in a filename; beyond this the id alone
/// still disambiguates.
const MAX_TITLE_CHARS: usize = 120;

/// Reduce an untrusted title to filename-safe characters.
///
/// Anything that is not alphanumeric or in a small allowlist collapses to
/// '_', so separators and traversal sequences cannot survive. Leading and
/// trailing dots and whitespace are stripped so the result can never be a
/// relative path component.
fn sanitize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .take(MAX_TITLE_CHARS)
        .map(|c| {
            if c.is_alphanumeric() || " -_.()[]".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();

    cleaned
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

/// Build the destination path for one (video, format) pair:
/// `<dir>/<title> [<id>].<ext>`.
///
/// The embedded platform id makes names unique across videos and
/// deterministic per video, so repeating a download resolves to the same
/// path and the overwrite policy can decide what happens. A title that
/// sanitizes away entirely falls back to the id alone.
pub fn build_output_path(dir: &Path, title: &str, id: &str, ext: &str) -> PathBuf {
    let title = sanitize(title);
    let id = sanitize(id);

    // A title of nothing but replacement characters is no title at all
    let name = if title.chars().all(|c| !c.is_alphanumeric()) {
        format!("{id}.{ext}")
    } else {
        format!("{title} [{id}].{ext}")
    };

    dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_sequences_cannot_escape_the_directory() {
        let path = build_output_path(Path::new("/dl"), "../../etc/passwd", "abc123def45", "mp4");

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(path.starts_with("/dl"));
        assert!(!name.contains('/') && !name.contains('\\'));
        assert!(!name.starts_with('.'));
        assert!(name.ends_with("[abc123def45].mp4"));
    }

    #[test]
    fn shell_and_separator_characters_are_collapsed() {
        let path = build_output_path(Path::new("/dl"), "a/b\\c:d*e?f\"g|h", "id123456789", "mp4");

        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name, "a_b_c_d_e_f_g_h [id123456789].mp4");
    }

    #[test]
    fn ordinary_titles_survive_readably() {
        let path = build_output_path(
            Path::new("/dl"),
            "Never Gonna Give You Up (Official)",
            "dQw4w9WgXcQ",
            "mp4",
        );

        assert_eq!(
            path,
            Path::new("/dl/Never Gonna Give You Up (Official) [dQw4w9WgXcQ].mp4")
        );
    }

    #[test]
    fn empty_or_unsanitizable_titles_fall_back_to_the_id() {
        for title in ["", "...", "///", "  .  "] {
            let path = build_output_path(Path::new("/dl"), title, "dQw4w9WgXcQ", "mp3");
            assert_eq!(path, Path::new("/dl/dQw4w9WgXcQ.mp3"), "{title:?}");
        }
    }

    #[test]
    fn very_long_titles_are_truncated() {
        let long = "x".repeat(400);
        let path = build_output_path(Path::new("/dl"), &long, "dQw4w9WgXcQ", "mp4");

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.chars().count() < 160);
    }

    #[test]
    fn same_inputs_always_map_to_the_same_path() {
        let a = build_output_path(Path::new("/dl"), "Song: Live!", "id123456789", "mp3");
        let b = build_output_path(Path::new("/dl"), "Song: Live!", "id123456789", "mp3");
        assert_eq!(a, b);
    }
}
