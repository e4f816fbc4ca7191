#![no_main]

use libfuzzer_sys::fuzz_target;

// Classification is total: any string yields a lineage and a consistent profile.
fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else { return };
    let profile = tailpatch_domain::resolve(s);
    assert_eq!(profile.lineage, tailpatch_domain::classify(s));
    assert_eq!(profile.lineage.is_supported(), !profile.is_empty());
});
