//! YAML form of a tree: files are `null`, directories are nested mappings.
//!
//! ```yaml
//! a.txt: ~
//! sub:
//!   b.txt: ~
//! empty: {}
//! ```

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml, YamlEmitter};
use snafu::prelude::*;

use crate::tree::{Entry, TreeNode, is_valid_name};

/// Parses a YAML document into a tree. The top level must be a mapping.
pub fn tree_from_yaml(text: &str) -> Result<TreeNode, TreeYamlError> {
    let documents = Yaml::load_from_str(text).context(ParseSnafu)?;
    let document = documents.first().context(EmptyDocumentSnafu)?;

    let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;
    node_from_mapping(top_level, Path::new(""))
}

/// Renders an entry as YAML. A file entry renders as a bare `~`.
pub fn entry_to_yaml(entry: &Entry) -> Result<String, TreeYamlError> {
    let yaml = match entry {
        Entry::File => Yaml::Value(Scalar::Null),
        Entry::Directory(node) => node_to_yaml(node),
    };

    let mut out = String::new();
    {
        let mut emitter = YamlEmitter::new(&mut out);
        emitter.dump(&yaml).map_err(|error| TreeYamlError::EmitError {
            message: format!("{error:?}"),
        })?;
    }
    out.push('\n');
    Ok(out)
}

fn node_from_mapping(
    mapping: &LinkedHashMap<Yaml<'_>, Yaml<'_>>,
    parent: &Path,
) -> Result<TreeNode, TreeYamlError> {
    mapping
        .iter()
        .map(|(key, value)| {
            let name = key_name(key).context(InvalidKeySnafu {
                parent: parent.to_path_buf(),
            })?;
            ensure!(
                is_valid_name(&name),
                InvalidNameSnafu {
                    parent: parent.to_path_buf(),
                    name,
                }
            );
            let path = parent.join(&name);
            let entry = match value {
                Yaml::Value(Scalar::Null) => Entry::File,
                Yaml::Mapping(inner) => Entry::Directory(node_from_mapping(inner, &path)?),
                _ => return InvalidValueSnafu { path }.fail(),
            };
            Ok((name, entry))
        })
        .collect()
}

fn key_name(key: &Yaml<'_>) -> Option<String> {
    match key {
        Yaml::Value(Scalar::String(name)) => Some(name.to_string()),
        Yaml::Value(Scalar::Integer(number)) => Some(number.to_string()),
        _ => None,
    }
}

fn node_to_yaml(node: &TreeNode) -> Yaml<'static> {
    let mapping = node
        .iter()
        .map(|(name, entry)| {
            let key = Yaml::Value(Scalar::String(Cow::Owned(name.to_string())));
            let value = match entry {
                Entry::File => Yaml::Value(Scalar::Null),
                Entry::Directory(inner) => node_to_yaml(inner),
            };
            (key, value)
        })
        .collect::<LinkedHashMap<_, _>>();
    Yaml::Mapping(mapping)
}

#[derive(Debug, Snafu)]
pub enum TreeYamlError {
    #[snafu(display("Failed to parse the tree document"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("The tree document is empty"))]
    EmptyDocument,
    #[snafu(display("Top level of a tree document should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Entry names below '{}' must be strings", parent.display()))]
    InvalidKeyError { parent: PathBuf },
    #[snafu(display(
        "Entry name '{}' below '{}' is not a single path component",
        name,
        parent.display()
    ))]
    InvalidNameError { parent: PathBuf, name: String },
    #[snafu(display("Entry '{}' must be null (file) or a map (directory)", path.display()))]
    InvalidValueError { path: PathBuf },
    #[snafu(display("Failed to render the tree as YAML: {}", message))]
    EmitError { message: String },
}
