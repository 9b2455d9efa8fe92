use colored::Colorize;

use crate::tree::{Entry, TreeNode};

/// Renders `entry` as an indented tree rooted at `name`, followed by a
/// summary line. Children are sorted by name.
pub fn render_tree(name: &str, entry: &Entry, style: bool) -> String {
    let mut out = String::new();
    match entry {
        Entry::File => {
            out.push_str(&decorate(name, entry, style));
            out.push('\n');
            out.push_str("0 directories, 1 file\n");
        }
        Entry::Directory(node) => {
            out.push_str(&decorate(name, entry, style));
            out.push('\n');
            render_children(node, "", style, &mut out);
            let (files, directories) = node.count();
            out.push_str(&format!(
                "{} {}, {} {}\n",
                directories,
                plural(directories, "directory", "directories"),
                files,
                plural(files, "file", "files"),
            ));
        }
    }
    out
}

fn render_children(node: &TreeNode, prefix: &str, style: bool, out: &mut String) {
    let mut children = node.iter().collect::<Vec<_>>();
    children.sort_by(|(a, _), (b, _)| a.cmp(b));

    let last_index = children.len().saturating_sub(1);
    for (index, (name, entry)) in children.into_iter().enumerate() {
        let is_last = index == last_index;
        let connector = if is_last { "└── " } else { "├── " };
        out.push_str(prefix);
        out.push_str(connector);
        out.push_str(&decorate(name, entry, style));
        out.push('\n');

        if let Entry::Directory(inner) = entry {
            let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
            render_children(inner, &child_prefix, style, out);
        }
    }
}

fn decorate(name: &str, entry: &Entry, style: bool) -> String {
    match (entry, style) {
        (Entry::Directory(_), true) => format!("{}/", name.blue().bold()),
        (Entry::Directory(_), false) => format!("{name}/"),
        (Entry::File, _) => name.to_string(),
    }
}

fn plural(count: usize, one: &'static str, many: &'static str) -> &'static str {
    if count == 1 { one } else { many }
}
