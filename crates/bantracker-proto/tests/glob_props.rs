//! Property tests for mask matching.

use bantracker_proto::{glob_match, CaseMapping};
use proptest::prelude::*;

proptest! {
    #[test]
    fn literal_mask_matches_itself(s in "[a-zA-Z0-9.@!\\[\\]{}|^-]{0,40}") {
        prop_assert!(glob_match(&s, &s, CaseMapping::Rfc1459));
    }

    #[test]
    fn star_matches_anything(s in ".{0,60}") {
        prop_assert!(glob_match("*", &s, CaseMapping::Rfc1459));
    }

    #[test]
    fn case_insensitive(s in "[a-z0-9]{1,30}") {
        let upper = s.to_ascii_uppercase();
        prop_assert!(glob_match(&s, &upper, CaseMapping::Ascii));
    }

    #[test]
    fn question_marks_count_chars(n in 0usize..20, m in 0usize..20) {
        let mask = "?".repeat(n);
        let text = "x".repeat(m);
        prop_assert_eq!(glob_match(&mask, &text, CaseMapping::Rfc1459), n == m);
    }

    #[test]
    fn host_suffix(nick in "[a-z]{1,9}", user in "[a-z]{1,9}", host in "[a-z]{1,12}") {
        let hostmask = format!("{nick}!{user}@{host}.example.com");
        prop_assert!(glob_match("*!*@*.example.com", &hostmask, CaseMapping::Rfc1459));
        prop_assert!(!glob_match("*!*@*.example.org", &hostmask, CaseMapping::Rfc1459));
    }
}
