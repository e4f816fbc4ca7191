#![no_main]

use camino::Utf8PathBuf;
use libfuzzer_sys::fuzz_target;
use tailpatch_types::PluginSpec;

const STUB: &str = "let localModules = {\n}\n";

// Arbitrary manifests must never panic; a successful patch must be idempotent.
fuzz_target!(|data: &[u8]| {
    let Ok(manifest) = std::str::from_utf8(data) else { return };
    let Ok(td) = tempfile::tempdir() else { return };
    let Ok(root) = Utf8PathBuf::from_path_buf(td.path().to_path_buf()) else { return };
    if std::fs::write(root.join("package.json"), manifest).is_err()
        || std::fs::write(root.join("standalone.js"), STUB).is_err()
    {
        return;
    }

    let Ok(plugin) = PluginSpec::new(r#""daisyui": "^4.12.23""#) else { return };
    let plugin = plugin.with_legacy_require("'daisyui': require('daisyui')");

    if tailpatch_edit::apply_plugin(&plugin, "3.4.17", &root).is_ok() {
        let before = std::fs::read(root.join("package.json")).ok();
        let _ = tailpatch_edit::apply_plugin(&plugin, "3.4.17", &root);
        assert_eq!(std::fs::read(root.join("package.json")).ok(), before);
    }
});
