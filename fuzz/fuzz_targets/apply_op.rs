#![no_main]

//! Apply one structured rule to an arbitrary document.
//!
//! Rules must never panic, and a failed rule must leave the document as it
//! was. A successful rule must be idempotent.

use libfuzzer_sys::fuzz_target;
use ocpatch_edit::{PlistDocument, apply_op};
use ocpatch_types::ops::{Cardinality, PatchOp, PlistValue, ToggleScope};

#[derive(Debug, arbitrary::Arbitrary)]
struct Input {
    document: String,
    key: String,
    rule: RuleChoice,
}

#[derive(Debug, arbitrary::Arbitrary)]
enum RuleChoice {
    SetString { value: String, any: bool },
    SetInteger { value: i64 },
    SetBool { value: bool },
    Toggle { marker: String, enabled: bool, window: Option<u16> },
    ReplaceArray { body: String },
    MergeBootArgs { tokens: Vec<String> },
}

fn build(key: String, rule: RuleChoice) -> PatchOp {
    let set = |value, cardinality| PatchOp::SetValue {
        key: key.clone(),
        value,
        cardinality,
    };
    match rule {
        RuleChoice::SetString { value, any } => set(
            PlistValue::String(value),
            if any {
                Cardinality::Any
            } else {
                Cardinality::ExactlyOne
            },
        ),
        RuleChoice::SetInteger { value } => set(PlistValue::Integer(value), Cardinality::ExactlyOne),
        RuleChoice::SetBool { value } => set(PlistValue::Bool(value), Cardinality::ExactlyOne),
        RuleChoice::Toggle {
            marker,
            enabled,
            window,
        } => PatchOp::ToggleNear {
            marker,
            field: key,
            enabled,
            scope: window.map_or(ToggleScope::EnclosingDict, |n| ToggleScope::Window(n.into())),
        },
        RuleChoice::ReplaceArray { body } => PatchOp::ReplaceArray {
            block: format!("<key>{key}</key><array>{body}</array>"),
            key,
        },
        RuleChoice::MergeBootArgs { tokens } => PatchOp::MergeBootArgs { tokens },
    }
}

fuzz_target!(|input: Input| {
    let op = build(input.key, input.rule);
    let mut doc = PlistDocument::new(input.document.clone());

    match apply_op(&mut doc, &op) {
        Ok(_) => {
            let once = doc.as_str().to_string();
            if apply_op(&mut doc, &op).is_ok() {
                assert_eq!(doc.as_str(), once, "rule is not idempotent: {op:?}");
            }
        }
        Err(_) => assert_eq!(doc.as_str(), input.document),
    }
});
