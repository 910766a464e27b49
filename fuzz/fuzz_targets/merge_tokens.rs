#![no_main]

use libfuzzer_sys::fuzz_target;
use ocpatch_edit::merge_tokens;

fuzz_target!(|input: (String, Vec<String>)| {
    let (existing, required) = input;
    let merged = merge_tokens(&existing, &required);

    for token in required.iter().flat_map(|t| t.split_whitespace()) {
        assert!(merged.split_whitespace().any(|t| t == token));
    }
    assert_eq!(merge_tokens(&merged, &required), merged);
    assert!(!merged.starts_with(char::is_whitespace));
});
