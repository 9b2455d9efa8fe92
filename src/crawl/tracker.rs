use std::path::{Path, PathBuf};

use derive_more::{Deref, Display, From};

/// A path that advances and retreats in step with traversal depth.
#[derive(Debug, Clone, PartialEq, Eq, Deref, Display, From)]
#[display("{}", _0.display())]
pub struct Cursor(PathBuf);

impl Cursor {
    pub fn path(&self) -> &Path {
        &self.0
    }

    fn descend(&mut self, name: &str) {
        self.0.push(name);
    }

    fn ascend(&mut self) {
        self.0.pop();
    }
}

/// Lock-step cursors for one replay: an optional read-side source cursor
/// and one cursor per destination root.
///
/// Every cursor's suffix below its root mirrors the replay position. The
/// tracker never ascends above the roots it was seeded with.
#[derive(Debug, Clone)]
pub struct PathTracker {
    source: Option<Cursor>,
    destinations: Vec<Cursor>,
    depth: usize,
}

impl PathTracker {
    /// Tracker without a read side, used when writes need no source.
    pub fn new<I, P>(destinations: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            source: None,
            destinations: destinations
                .into_iter()
                .map(|root| Cursor::from(root.into()))
                .collect(),
            depth: 0,
        }
    }

    pub fn with_source<I, P>(source: impl Into<PathBuf>, destinations: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            source: Some(Cursor::from(source.into())),
            ..Self::new(destinations)
        }
    }

    /// Appends `name` to every cursor.
    pub fn descend(&mut self, name: &str) {
        self.cursors_mut().for_each(|cursor| cursor.descend(name));
        self.depth += 1;
    }

    /// Strips one segment from every cursor. Returns false, leaving every
    /// cursor untouched, when already at the roots.
    pub fn ascend(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        self.cursors_mut().for_each(Cursor::ascend);
        self.depth -= 1;
        true
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_ref().map(Cursor::path)
    }

    pub fn destinations(&self) -> impl Iterator<Item = &Path> {
        self.destinations.iter().map(Cursor::path)
    }

    /// Destination paths that may be written to: every destination except
    /// those currently equal to the source cursor.
    pub fn write_targets(&self) -> Vec<PathBuf> {
        self.destinations()
            .filter(|destination| Some(*destination) != self.source())
            .map(Path::to_path_buf)
            .collect()
    }

    fn cursors_mut(&mut self) -> impl Iterator<Item = &mut Cursor> {
        self.source.iter_mut().chain(self.destinations.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursors_move_in_lock_step() {
        let mut tracker = PathTracker::with_source("/src", ["/one", "/two"]);

        tracker.descend("sub");
        tracker.descend("file.txt");

        assert_eq!(tracker.source(), Some(Path::new("/src/sub/file.txt")));
        assert_eq!(
            tracker.write_targets(),
            vec![
                PathBuf::from("/one/sub/file.txt"),
                PathBuf::from("/two/sub/file.txt")
            ]
        );
        assert_eq!(tracker.depth(), 2);

        assert!(tracker.ascend());
        assert_eq!(tracker.source(), Some(Path::new("/src/sub")));
        assert_eq!(
            tracker.destinations().collect::<Vec<_>>(),
            vec![Path::new("/one/sub"), Path::new("/two/sub")]
        );
    }

    #[test]
    fn never_ascends_above_the_roots() {
        let mut tracker = PathTracker::new(["/base"]);
        tracker.descend("a");

        assert!(tracker.ascend());
        assert!(!tracker.ascend());
        assert_eq!(tracker.write_targets(), vec![PathBuf::from("/base")]);
    }

    #[test]
    fn destinations_equal_to_the_source_are_not_written() {
        let mut tracker = PathTracker::with_source("/src", ["/src", "/dst"]);
        tracker.descend("a.txt");

        assert_eq!(tracker.write_targets(), vec![PathBuf::from("/dst/a.txt")]);
    }

    #[test]
    fn trackers_without_source_write_everywhere() {
        let tracker = PathTracker::new(["/a", "/b"]);
        assert_eq!(tracker.source(), None);
        assert_eq!(tracker.write_targets().len(), 2);
    }

    #[test]
    fn cursor_displays_its_path() {
        let cursor = Cursor::from(PathBuf::from("/some/where"));
        assert_eq!(cursor.to_string(), "/some/where");
        assert!(cursor.ends_with("where"));
    }
}
