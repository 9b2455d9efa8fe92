use std::path::{Component, Path, PathBuf};

use derive_more::IsVariant;
use hashlink::LinkedHashMap;
use snafu::Snafu;

/// One child of a [`TreeNode`]: either a file leaf or a nested directory.
#[derive(Debug, Clone, PartialEq, Eq, IsVariant)]
pub enum Entry {
    File,
    Directory(TreeNode),
}

impl Entry {
    pub fn as_directory(&self) -> Option<&TreeNode> {
        match self {
            Entry::Directory(node) => Some(node),
            Entry::File => None,
        }
    }
}

/// Whether `name` is usable as a child name: exactly one normal path
/// component, so joining it onto a directory always lands one level below.
pub fn is_valid_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(components.next(), Some(Component::Normal(part)) if part == name)
        && components.next().is_none()
}

/// In-memory shape of one directory level.
///
/// Children keep their insertion order, which replay uses as the visiting
/// order. Equality is structural and ignores that order.
#[derive(Debug, Clone, Default)]
pub struct TreeNode {
    children: LinkedHashMap<String, Entry>,
}

impl TreeNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from relative paths, each naming a file. Intermediate
    /// directories are created on the way.
    pub fn from_relative_paths<I, P>(paths: I) -> Result<Self, CannotInsertIntoFileError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths.into_iter().try_fold(Self::new(), |mut root, path| {
            root.try_insert_path(path.as_ref())?;
            Ok(root)
        })
    }

    /// Inserts a file leaf at `path`, creating the directories above it.
    pub fn try_insert_path(&mut self, path: &Path) -> Result<(), CannotInsertIntoFileError> {
        self.insert_path_as(path, Entry::File)
    }

    /// Inserts an empty directory at `path`, creating the directories above it.
    pub fn try_insert_directory(&mut self, path: &Path) -> Result<(), CannotInsertIntoFileError> {
        self.insert_path_as(path, Entry::Directory(TreeNode::new()))
    }

    fn insert_path_as(&mut self, path: &Path, leaf: Entry) -> Result<(), CannotInsertIntoFileError> {
        let names = path
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>();

        let Some((last, parents)) = names.split_last() else {
            return Ok(());
        };

        let mut current = self;
        for name in parents {
            let entry = current
                .children
                .entry(name.clone())
                .or_insert_with(|| Entry::Directory(TreeNode::new()));
            current = match entry {
                Entry::Directory(node) => node,
                Entry::File => {
                    return Err(CannotInsertIntoFileError {
                        path: path.to_path_buf(),
                    });
                }
            };
        }

        let existing_is_directory = current.children.get(last).map(Entry::is_directory);
        match existing_is_directory {
            Some(false) if leaf.is_directory() => Err(CannotInsertIntoFileError {
                path: path.to_path_buf(),
            }),
            Some(true) => Ok(()),
            _ => {
                current.children.insert(last.clone(), leaf);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.children.get(name)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.children.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Splits the children into file names and directory nodes, both in
    /// insertion order.
    pub fn partition(&self) -> (Vec<&str>, Vec<(&str, &TreeNode)>) {
        let mut files = Vec::new();
        let mut directories = Vec::new();
        for (name, entry) in self.iter() {
            match entry {
                Entry::File => files.push(name),
                Entry::Directory(node) => directories.push((name, node)),
            }
        }
        (files, directories)
    }

    /// Looks up the entry at a relative path.
    pub fn lookup(&self, path: impl AsRef<Path>) -> Option<&Entry> {
        let mut names = path
            .as_ref()
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy()),
                _ => None,
            })
            .peekable();

        let mut current = self;
        while let Some(name) = names.next() {
            let entry = current.get(&name)?;
            if names.peek().is_none() {
                return Some(entry);
            }
            current = entry.as_directory()?;
        }
        None
    }

    /// Number of files and directories below this node.
    pub fn count(&self) -> (usize, usize) {
        self.iter().fold((0, 0), |(files, dirs), (_, entry)| match entry {
            Entry::File => (files + 1, dirs),
            Entry::Directory(node) => {
                let (inner_files, inner_dirs) = node.count();
                (files + inner_files, dirs + 1 + inner_dirs)
            }
        })
    }
}

impl PartialEq for TreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(name, entry)| other.get(name) == Some(entry))
    }
}

impl Eq for TreeNode {}

impl FromIterator<(String, Entry)> for TreeNode {
    fn from_iter<T: IntoIterator<Item = (String, Entry)>>(iter: T) -> Self {
        Self {
            children: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("Cannot insert below a file: {}", path.display()))]
pub struct CannotInsertIntoFileError {
    path: PathBuf,
}
