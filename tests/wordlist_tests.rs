use sub_scan_rs::wordlist::{default_wordlist, load_wordlist_or_default, parse_wordlist_str};

#[test]
fn parse_labels_with_comments_and_dedup() {
    let input = r#"
        # common labels
        www
        api   # programmatic
        WWW   # duplicate after lowercasing
        cgi-bin
        # blank line follows

    "#;

    let labels = parse_wordlist_str(input).expect("parse ok");
    // Dedup preserves first-appearance order, case-normalized
    assert_eq!(labels, vec!["www", "api", "cgi-bin"]);
}

#[test]
fn invalid_label_rejected() {
    let input = "not a label\n"; // spaces are not allowed inside a label
    assert!(parse_wordlist_str(input).is_err());
}

#[test]
fn default_list_is_deduplicated() {
    let d = default_wordlist();
    let unique: std::collections::HashSet<_> = d.iter().collect();
    assert_eq!(unique.len(), d.len());
}

#[test]
fn missing_file_falls_back_to_default() {
    let path = std::env::temp_dir().join("sub-scan-rs-no-such-wordlist.txt");
    let labels = load_wordlist_or_default(&path).expect("missing file is not an error");
    assert_eq!(labels, default_wordlist());
}

#[test]
fn empty_file_falls_back_to_default() {
    let path = std::env::temp_dir().join(format!("sub-scan-rs-empty-{}.txt", std::process::id()));
    std::fs::write(&path, "# comments only\n\n").expect("write temp wordlist");
    let res = load_wordlist_or_default(&path);
    std::fs::remove_file(&path).expect("cleanup temp wordlist");
    assert_eq!(res.expect("empty file is not an error"), default_wordlist());
}

#[test]
fn malformed_existing_file_is_an_error_not_the_default() {
    let path = std::env::temp_dir().join(format!(
        "sub-scan-rs-malformed-{}.txt",
        std::process::id()
    ));
    std::fs::write(&path, "www\nbad label\n").expect("write temp wordlist");
    let res = load_wordlist_or_default(&path);
    std::fs::remove_file(&path).expect("cleanup temp wordlist");
    let err = res.expect_err("a present but malformed wordlist must surface its parse error");
    // The line-numbered parse context survives the fallback wrapper.
    assert!(format!("{err:#}").contains("line 2"));
}
