//! Local name filter over an already-loaded listing.

use bridge_traits::MediaFile;

/// Files whose name contains `term`, compared case-insensitively.
///
/// Order follows `files`. An empty term matches everything.
pub fn filter_by_name(files: &[MediaFile], term: &str) -> Vec<MediaFile> {
    let needle = term.to_lowercase();
    files
        .iter()
        .filter(|file| file.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(names: &[&str]) -> Vec<MediaFile> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| MediaFile::new(i.to_string(), *name, "image/png"))
            .collect()
    }

    fn names(files: &[MediaFile]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_case_insensitive_substring() {
        let files = listing(&["vacation.png", "Report.pdf"]);

        assert_eq!(names(&filter_by_name(&files, "vac")), vec!["vacation.png"]);
        assert_eq!(names(&filter_by_name(&files, "REP")), vec!["Report.pdf"]);
        assert_eq!(names(&filter_by_name(&files, "ort.P")), vec!["Report.pdf"]);
    }

    #[test]
    fn test_empty_term_is_identity() {
        let files = listing(&["b.png", "a.png", "c.mp4"]);
        assert_eq!(filter_by_name(&files, ""), files);
    }

    #[test]
    fn test_result_is_ordered_subset() {
        let files = listing(&["Summer-1.jpg", "winter.jpg", "summer-2.jpg", "SUMMER.mov"]);
        let filtered = filter_by_name(&files, "summer");

        assert_eq!(
            names(&filtered),
            vec!["Summer-1.jpg", "summer-2.jpg", "SUMMER.mov"]
        );
        assert!(filtered.iter().all(|f| files.contains(f)));
    }

    #[test]
    fn test_no_match() {
        let files = listing(&["a.png"]);
        assert!(filter_by_name(&files, "zzz").is_empty());
        assert!(filter_by_name(&[], "a").is_empty());
    }

    #[test]
    fn test_unicode_names() {
        let files = listing(&["Ärger.png", "Straße.jpg"]);
        assert_eq!(names(&filter_by_name(&files, "ärg")), vec!["Ärger.png"]);
        assert_eq!(names(&filter_by_name(&files, "STRASSE")), Vec::<&str>::new());
    }
}
