use std::sync::Arc;

use proptest::prelude::*;
use proptest::sample::subsequence;
use tsforge::config::{PackageManifest, ResolvedConfig};
use tsforge::external::{ExternalClassifier, ExternalDecision, PatternSet};
use tsforge::fs::mock::MockFileSystem;
use tsforge::types::Platform;

const PATTERNS: [&str; 6] = ["alpha", "beta", "@scope/*", "/^del/", "@scope/gamma", "fs"];

const SPECIFIERS: [&str; 10] = [
    "alpha",
    "alpha/sub",
    "beta",
    "@scope/gamma",
    "@scope/gamma/sub",
    "delta",
    "epsilon",
    "./local",
    "fs",
    "node:path",
];

fn classifier(platform: Platform, external: &[&str], no_external: &[&str], skip: bool) -> ExternalClassifier {
    let fs = MockFileSystem::new();
    fs.add_dir("/p/node_modules/epsilon");

    let mut cfg = ResolvedConfig::new("p", "/p");
    cfg.platform = platform;
    cfg.external = external.iter().map(|s| s.to_string()).collect();
    cfg.no_external = no_external.iter().map(|s| s.to_string()).collect();
    cfg.skip_node_modules_bundle = skip;
    cfg.manifest = Some(Arc::new(
        PackageManifest::parse(r#"{ "dependencies": { "beta": "1", "delta": "2" } }"#, "/p/package.json")
            .unwrap(),
    ));
    ExternalClassifier::new(&cfg, Arc::new(fs)).unwrap()
}

fn platform() -> impl Strategy<Value = Platform> {
    prop_oneof![Just(Platform::Node), Just(Platform::Neutral), Just(Platform::Browser)]
}

proptest! {
    #[test]
    fn no_external_match_bundles_unless_builtin(
        platform in platform(),
        external in subsequence(PATTERNS.to_vec(), 0..=PATTERNS.len()),
        no_external in subsequence(PATTERNS.to_vec(), 0..=PATTERNS.len()),
        skip in any::<bool>(),
    ) {
        let c = classifier(platform, &external, &no_external, skip);
        let rules = PatternSet::parse(&no_external.iter().map(|s| s.to_string()).collect::<Vec<_>>()).unwrap();

        for spec in SPECIFIERS {
            let decision = c.classify(spec, None);
            if decision != ExternalDecision::Builtin && rules.matches(spec) {
                prop_assert_eq!(decision, ExternalDecision::Bundle, "{}", spec);
            }
        }
    }

    #[test]
    fn removing_no_external_never_bundles_more(
        platform in platform(),
        external in subsequence(PATTERNS.to_vec(), 0..=PATTERNS.len()),
        no_external in subsequence(PATTERNS.to_vec(), 1..=PATTERNS.len()),
        drop_idx in any::<prop::sample::Index>(),
        skip in any::<bool>(),
    ) {
        let before = classifier(platform, &external, &no_external, skip);

        let mut reduced = no_external.clone();
        reduced.remove(drop_idx.index(no_external.len()));
        let after = classifier(platform, &external, &reduced, skip);

        for spec in SPECIFIERS {
            if before.is_external(spec, None) {
                prop_assert!(after.is_external(spec, None), "{} became bundled", spec);
            }
        }
    }
}

#[test]
fn builtins_ignore_no_external() {
    let c = classifier(Platform::Node, &[], &["fs"], false);
    assert_eq!(c.classify("fs", None), ExternalDecision::Builtin);
    assert_eq!(c.classify("node:path", None), ExternalDecision::Builtin);

    // Off Node a bare `fs` is an ordinary package name.
    let c = classifier(Platform::Browser, &[], &["fs"], false);
    assert_eq!(c.classify("fs", None), ExternalDecision::Bundle);
}
