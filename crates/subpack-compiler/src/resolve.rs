//! Specifier resolution.
//!
//! `./x` and `../x` resolve against the importing file, `/x` against the
//! source root and anything else against `node_modules` in the project root.
//! Each base path is tried as a file, with `.js`/`.ts` appended, then as a
//! directory through `package.json#main` and `index.js`/`index.ts`.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

const EXTENSIONS: &[&str] = &["js", "ts"];
const INDEX_FILES: &[&str] = &["index.js", "index.ts"];

#[derive(Debug, Clone)]
pub struct Resolver {
    source_root: PathBuf,
    project_root: PathBuf,
}

impl Resolver {
    pub fn new(source_root: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into().clean(),
            project_root: project_root.into().clean(),
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Resolve `specifier` imported by the file at `importer`.
    pub fn resolve(&self, importer: &Path, specifier: &str) -> Option<PathBuf> {
        let base = if specifier.starts_with("./") || specifier.starts_with("../") {
            importer.parent()?.join(specifier)
        } else if let Some(rooted) = specifier.strip_prefix('/') {
            self.source_root.join(rooted)
        } else {
            self.project_root.join("node_modules").join(specifier)
        };

        resolve_path(&base.clean())
    }
}

fn resolve_path(base: &Path) -> Option<PathBuf> {
    if base.is_file() {
        return Some(base.to_path_buf());
    }

    for ext in EXTENSIONS {
        let mut candidate = OsString::from(base.as_os_str());
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    if !base.is_dir() {
        return None;
    }

    if let Some(main) = package_main(base) {
        let main = base.join(main).clean();
        if main != base {
            if let Some(found) = resolve_path(&main) {
                return Some(found);
            }
        }
    }

    INDEX_FILES
        .iter()
        .map(|index| base.join(index))
        .find(|candidate| candidate.is_file())
}

fn package_main(dir: &Path) -> Option<String> {
    let manifest = fs::read_to_string(dir.join("package.json")).ok()?;
    let value: serde_json::Value = serde_json::from_str(&manifest).ok()?;
    value.get("main")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let (path, content) = file.split_once('=').unwrap_or((file, ""));
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn relative_rooted_and_package_specifiers() {
        let dir = tree(&[
            "src/pages/index/index.js",
            "src/utils/format.ts",
            "src/services/api/index.js",
            "node_modules/dayjs/package.json={\"main\": \"dayjs.min.js\"}",
            "node_modules/dayjs/dayjs.min.js",
        ]);
        let resolver = Resolver::new(dir.path().join("src"), dir.path());
        let importer = dir.path().join("src/pages/index/index.js");

        assert_eq!(
            resolver.resolve(&importer, "../../utils/format"),
            Some(dir.path().join("src/utils/format.ts"))
        );
        assert_eq!(
            resolver.resolve(&importer, "/services/api"),
            Some(dir.path().join("src/services/api/index.js"))
        );
        assert_eq!(
            resolver.resolve(&importer, "dayjs"),
            Some(dir.path().join("node_modules/dayjs/dayjs.min.js"))
        );
        assert_eq!(resolver.resolve(&importer, "./missing"), None);
    }

    #[test]
    fn exact_file_wins_over_appended_extension() {
        let dir = tree(&["src/a.js", "src/lib.wxs", "src/lib.wxs.js"]);
        let resolver = Resolver::new(dir.path().join("src"), dir.path());
        assert_eq!(
            resolver.resolve(&dir.path().join("src/a.js"), "./lib.wxs"),
            Some(dir.path().join("src/lib.wxs"))
        );
    }
}
