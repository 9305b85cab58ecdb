//! File handling: format detection (RON/JSON/TOML), data file discovery,
//! deserialization and the name lookup helpers used while resolving.

use aetherium_core::id::ItemTypeId;
use aetherium_core::registry::{CatalogError, ItemCatalog};
use aetherium_core::spec::SpecError;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("{dir} has no '{file}' data file (.ron, .toml or .json)")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("{file}: not a .ron, .toml or .json file")]
    UnsupportedFormat { file: PathBuf },

    /// The same data file exists in more than one format.
    #[error("both {a} and {b} exist; keep one")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("{file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("{file}: no {expected_kind} named '{name}'")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("{file}: '{name}' is defined twice")]
    DuplicateName { file: PathBuf, name: String },

    /// A value parsed but is out of range.
    #[error("{file}: bad value in '{name}': {detail}")]
    InvalidValue {
        file: PathBuf,
        name: String,
        detail: String,
    },

    /// The item or recipe catalog refused a definition.
    #[error("{file}: {source}")]
    Catalog {
        file: PathBuf,
        #[source]
        source: CatalogError,
    },

    /// A converter definition failed validation.
    #[error("converter '{name}': {source}")]
    Spec {
        name: String,
        #[source]
        source: SpecError,
    },

    #[error("no converter named '{0}' was loaded")]
    UnknownConverter(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Formats
// ===========================================================================

/// The text formats a data file may use, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }

    fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T, String> {
        match self {
            Format::Ron => ron::from_str(text).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

/// The format of `path`, from its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    Format::ALL
        .into_iter()
        .find(|f| Some(f.extension()) == ext)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

// ===========================================================================
// Discovery
// ===========================================================================

/// The `{stem}.ron`, `.toml` or `.json` file in `dir`, if there is exactly
/// one. Two or more is a `ConflictingFormats` error.
pub fn find_data_file(dir: &Path, stem: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut present: Vec<PathBuf> = Format::ALL
        .into_iter()
        .map(|f| dir.join(format!("{stem}.{}", f.extension())))
        .filter(|path| path.is_file())
        .collect();

    if present.len() > 1 {
        let b = present.swap_remove(1);
        let a = present.swap_remove(0);
        return Err(DataLoadError::ConflictingFormats { a, b });
    }
    Ok(present.pop())
}

/// [`find_data_file`] for files the loader cannot do without.
pub fn require_data_file(dir: &Path, stem: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, stem)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: stem.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read `path` and deserialize it in the format its extension names.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let text = std::fs::read_to_string(path)?;
    debug!(file = %path.display(), ?format, "parsing data file");
    format.parse(&text).map_err(|detail| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    })
}

/// Deserialize a list of definitions.
///
/// RON and JSON files hold the list itself. TOML has no top-level arrays,
/// so the list is the array of tables under `toml_key`.
pub fn deserialize_list<T: DeserializeOwned>(path: &Path, toml_key: &str) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }

    let parse_error = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };
    let mut table: toml::Table = deserialize_file(path)?;
    let list = table
        .remove(toml_key)
        .ok_or_else(|| parse_error(format!("missing key '{toml_key}' in TOML file")))?;
    list.try_into().map_err(|e: toml::de::Error| parse_error(e.to_string()))
}

// ===========================================================================
// Lookups
// ===========================================================================

/// `map[name]`, or `UnresolvedRef` naming what kind of thing was expected.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| unresolved(file, name, expected_kind))
}

/// The id of item `name` in a frozen catalog.
pub fn resolve_item(items: &ItemCatalog, name: &str, file: &Path) -> Result<ItemTypeId, DataLoadError> {
    items.item_id(name).ok_or_else(|| unresolved(file, name, "item"))
}

fn unresolved(file: &Path, name: &str, expected_kind: &'static str) -> DataLoadError {
    DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    }
}

/// `DuplicateName` if `name` is already a key of `map`.
pub fn check_duplicate<V>(map: &HashMap<String, V>, name: &str, file: &Path) -> Result<(), DataLoadError> {
    match map.contains_key(name) {
        true => Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        }),
        false => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ItemData, TomlItems};
    use aetherium_core::registry::ItemCatalogBuilder;
    use std::fs;

    fn scratch_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("aetherium_loader_{suffix}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    // -----------------------------------------------------------------------
    // detect_format
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("items.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("items.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("items.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_format_rejects_unknown_and_missing_extensions() {
        for path in ["items.yaml", "items"] {
            assert!(matches!(
                detect_format(Path::new(path)),
                Err(DataLoadError::UnsupportedFormat { .. })
            ));
        }
    }

    // -----------------------------------------------------------------------
    // find_data_file / require_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn find_data_file_picks_the_only_format() {
        let dir = scratch_dir("find_single");
        fs::write(dir.join("recipes.json"), "[]").unwrap();

        assert_eq!(find_data_file(&dir, "recipes").unwrap(), Some(dir.join("recipes.json")));
        assert_eq!(find_data_file(&dir, "items").unwrap(), None);

        cleanup(&dir);
    }

    #[test]
    fn two_formats_of_one_file_conflict() {
        let dir = scratch_dir("find_conflict");
        fs::write(dir.join("items.ron"), "[]").unwrap();
        fs::write(dir.join("items.toml"), "").unwrap();

        let result = find_data_file(&dir, "items");
        assert!(matches!(result, Err(DataLoadError::ConflictingFormats { .. })));

        cleanup(&dir);
    }

    #[test]
    fn required_file_must_exist() {
        let dir = scratch_dir("require_missing");

        let result = require_data_file(&dir, "converters");
        assert!(matches!(
            result,
            Err(DataLoadError::MissingRequired { ref file, .. }) if file == "converters"
        ));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // deserialize_file / deserialize_list
    // -----------------------------------------------------------------------

    #[test]
    fn deserialize_list_reads_all_three_formats() {
        let dir = scratch_dir("list_formats");
        let ron_path = dir.join("a.ron");
        let json_path = dir.join("b.json");
        let toml_path = dir.join("c.toml");
        fs::write(&ron_path, r#"[(name: "coal"), (name: "water_bucket", max_stack: Some(1))]"#).unwrap();
        fs::write(&json_path, r#"[{"name": "coal"}, {"name": "water_bucket", "max_stack": 1}]"#).unwrap();
        fs::write(
            &toml_path,
            r#"
[[items]]
name = "coal"

[[items]]
name = "water_bucket"
max_stack = 1
"#,
        )
        .unwrap();

        for path in [&ron_path, &json_path, &toml_path] {
            let items: Vec<ItemData> = deserialize_list(path, "items").unwrap();
            assert_eq!(items.len(), 2, "{}", path.display());
            assert_eq!(items[0].name, "coal");
            assert_eq!(items[0].max_stack, None);
            assert_eq!(items[1].max_stack, Some(1));
        }

        cleanup(&dir);
    }

    #[test]
    fn toml_wrapper_struct_parses() {
        let dir = scratch_dir("deser_toml");
        let path = dir.join("items.toml");
        fs::write(&path, "[[items]]\nname = \"coal\"\n").unwrap();

        let wrapper: TomlItems = deserialize_file(&path).unwrap();
        assert_eq!(wrapper.items.len(), 1);

        cleanup(&dir);
    }

    #[test]
    fn malformed_ron_is_a_parse_error() {
        let dir = scratch_dir("deser_parse_err");
        let path = dir.join("bad.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();

        let result: Result<Vec<ItemData>, _> = deserialize_file(&path);
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    #[test]
    fn toml_list_needs_its_key() {
        let dir = scratch_dir("list_toml_missing");
        let path = dir.join("items.toml");
        fs::write(&path, r#"foo = "bar""#).unwrap();

        let result: Result<Vec<ItemData>, _> = deserialize_list(&path, "items");
        assert!(matches!(
            result,
            Err(DataLoadError::Parse { ref detail, .. }) if detail.contains("items")
        ));

        cleanup(&dir);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result: Result<Vec<ItemData>, _> = deserialize_file(Path::new("/nonexistent/aetherium/items.ron"));
        assert!(matches!(result, Err(DataLoadError::Io(_))));
    }

    // -----------------------------------------------------------------------
    // Name helpers
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_name_found_and_missing() {
        let mut map = HashMap::new();
        map.insert("crusher".to_string(), 3usize);

        assert_eq!(*resolve_name(&map, "crusher", Path::new("recipes.ron"), "converter").unwrap(), 3);
        assert!(matches!(
            resolve_name(&map, "furnace", Path::new("recipes.ron"), "converter"),
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: "converter", .. }) if name == "furnace"
        ));
    }

    #[test]
    fn resolve_item_uses_the_catalog() {
        let mut builder = ItemCatalogBuilder::new();
        let coal = builder.register("coal");
        let items = builder.build().unwrap();

        assert_eq!(resolve_item(&items, "coal", Path::new("x.ron")).unwrap(), coal);
        assert!(matches!(
            resolve_item(&items, "coke", Path::new("x.ron")),
            Err(DataLoadError::UnresolvedRef { expected_kind: "item", .. })
        ));
    }

    #[test]
    fn check_duplicate_flags_existing_keys() {
        let mut map = HashMap::new();
        assert!(check_duplicate(&map, "coal", Path::new("items.ron")).is_ok());
        map.insert("coal".to_string(), ());
        assert!(matches!(
            check_duplicate(&map, "coal", Path::new("items.ron")),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "coal"
        ));
    }

    #[test]
    fn error_display_names_the_file() {
        let e = DataLoadError::ConflictingFormats {
            a: PathBuf::from("items.ron"),
            b: PathBuf::from("items.json"),
        };
        let msg = e.to_string();
        assert!(msg.contains("items.ron") && msg.contains("items.json"));

        let e = DataLoadError::Catalog {
            file: PathBuf::from("recipes.ron"),
            source: CatalogError::ZeroDuration("crush_iron_ore".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("recipes.ron") && msg.contains("crush_iron_ore"));
    }
}
