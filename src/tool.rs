//! Some useful tools for the project.
//!
//! Usually, you don't need to use this module directly.
//! [`crate::scheduler`] will automatically use these tools.

use url::Url;

/// The directory name for downloaded posts.
///
/// Random posts all go to `random`, otherwise the tags are joined with commas,
/// e.g. `"cat solo"` becomes `"cat,solo"`.
pub fn dir_name_for(random: bool, tags: &str) -> String {
    if random {
        String::from("random")
    } else {
        tags.replace(' ', ",")
    }
}

/// The last path segment of `url`, which is used as the local file name.
///
/// Returns `None` if the path is empty or ends with `/`.
pub(crate) fn file_name_from_url(url: &Url) -> Option<&str> {
    url.path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_name_for() {
        assert_eq!(dir_name_for(true, "ignored"), "random");
        assert_eq!(dir_name_for(false, "a b c"), "a,b,c");
        assert_eq!(dir_name_for(false, "black_hair"), "black_hair");
        assert_eq!(dir_name_for(false, ""), "");
    }

    #[test]
    fn test_file_name_from_url() {
        let url = Url::parse("https://cdn.example.com/data/ab/cd/abcd.jpg?download=1").unwrap();
        assert_eq!(file_name_from_url(&url), Some("abcd.jpg"));

        let url = Url::parse("https://cdn.example.com/data/").unwrap();
        assert_eq!(file_name_from_url(&url), None);

        let url = Url::parse("https://cdn.example.com").unwrap();
        assert_eq!(file_name_from_url(&url), None);

        let url = Url::parse("data:image/png;base64,AAAA").unwrap();
        assert_eq!(file_name_from_url(&url), None);
    }
}
