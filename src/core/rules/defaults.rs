//! Built-in rules installed on first run.

use super::types::SortRule;

pub fn default_rules() -> Vec<SortRule> {
    vec![
        SortRule::for_extensions(
            "Images",
            &["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "ico", "tiff", "raw", "heic"],
            "Images",
            100,
        ),
        SortRule::for_extensions(
            "Documents",
            &[
                "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "rtf", "odt", "ods",
                "odp", "csv", "epub",
            ],
            "Documents",
            90,
        ),
        SortRule::for_extensions(
            "Installers",
            &["exe", "msi", "dmg", "pkg", "deb", "rpm", "appimage", "snap"],
            "Installers",
            80,
        ),
        SortRule::for_extensions(
            "Archives",
            &["zip", "rar", "7z", "tar", "gz", "bz2", "xz", "tgz"],
            "Archives",
            70,
        ),
        SortRule::for_extensions(
            "Audio",
            &["mp3", "wav", "flac", "aac", "ogg", "m4a", "wma", "opus"],
            "Audio",
            60,
        ),
        SortRule::for_extensions(
            "Video",
            &["mp4", "mkv", "avi", "mov", "wmv", "webm", "flv", "m4v"],
            "Video",
            50,
        ),
        SortRule::for_extensions(
            "Code",
            &[
                "js", "ts", "jsx", "tsx", "py", "rs", "go", "java", "cpp", "c", "h", "hpp", "cs",
                "rb", "php", "swift", "kt",
            ],
            "Code",
            40,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::validate_rules;

    #[test]
    fn built_in_rules_are_valid() {
        assert!(validate_rules(&default_rules()).is_ok());
    }

    #[test]
    fn built_in_rules_have_no_default() {
        assert!(default_rules().iter().all(|r| !r.is_default));
    }
}
