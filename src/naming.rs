use std::path::is_separator;

pub const AUDIO_EXTENSION: &str = "mp3";

pub fn output_name(index: usize, title: &str) -> String {
    let escaped = title
        .chars()
        .map(|character| if is_separator(character) { '_' } else { character })
        .collect::<String>();
    format!("{:02}. {}", index + 1, escaped)
}

pub fn output_file_name(index: usize, title: &str) -> String {
    format!("{}.{}", output_name(index, title), AUDIO_EXTENSION)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn output_name_pads_one_based_index() {
        assert_eq!(output_name(0, "Intro"), "01. Intro");
        assert_eq!(output_name(1, "Track One"), "02. Track One");
        assert_eq!(output_name(99, "Late"), "100. Late");
    }

    #[test]
    fn output_name_escapes_path_separators() {
        assert_eq!(output_name(0, "A/B"), "01. A_B");
        assert_eq!(output_name(4, "/a//b/"), "05. _a__b_");
        assert!(!output_name(2, "x/y/z").contains('/'));
    }

    #[test]
    fn output_name_escapes_every_platform_separator() {
        let separators = ['/', '\\']
            .into_iter()
            .filter(|character| is_separator(*character))
            .collect::<String>();
        assert!(separators.contains('/'));

        let name = output_name(0, &format!("a{separators}b"));
        assert!(!name.chars().skip(4).any(is_separator), "name: {name:?}");
        assert_eq!(name, format!("01. a{}b", "_".repeat(separators.len())));
    }

    #[test]
    fn output_name_is_distinct_for_colliding_titles() {
        let names = (0..150)
            .map(|index| output_name(index, "Same"))
            .collect::<HashSet<String>>();
        assert_eq!(names.len(), 150);
    }

    #[test]
    fn output_file_name_appends_audio_extension() {
        assert_eq!(output_file_name(2, "Finale"), "03. Finale.mp3");
    }

    proptest! {
        #[test]
        fn output_name_differs_for_distinct_indices(
            first in 0usize..1000,
            second in 0usize..1000,
            title in "\\PC{0,40}",
        ) {
            prop_assume!(first != second);
            prop_assert_ne!(output_name(first, &title), output_name(second, &title));
        }

        #[test]
        fn output_name_never_keeps_a_separator(index in 0usize..200, title in "[a-z/ ]{0,40}") {
            let name = output_name(index, &title);
            prop_assert!(!name.contains('/'), "name: {:?}", name);
            prop_assert_eq!(name.chars().count(), format!("{:02}. ", index + 1).len() + title.chars().count());
        }
    }
}
