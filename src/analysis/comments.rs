//! Associates comment groups with the nodes they annotate, the way the
//! suppression scanner needs them: a group on the line(s) directly above
//! a node belongs to that node, and a trailing comment belongs to the
//! outermost node starting on its line.

use std::collections::HashMap;

use tree_sitter::Node;

#[derive(Debug, Default)]
pub struct CommentMap {
    groups: HashMap<usize, Vec<String>>,
}

impl CommentMap {
    pub fn build(root: Node, source: &str) -> Self {
        let mut comments = Vec::new();
        let mut anchors: HashMap<usize, (usize, usize)> = HashMap::new();
        index_tree(root, source, &mut comments, &mut anchors);

        let mut map = CommentMap::default();
        for group in group_comments(&comments) {
            let first = &comments[group[0]];
            let last = &comments[*group.last().unwrap()];
            let text = group
                .iter()
                .map(|&i| comments[i].text.as_str())
                .collect::<Vec<_>>()
                .join("\n");

            // Trailing: some node begins on the comment's own line,
            // before the comment.
            let target = anchors
                .get(&first.start_row)
                .filter(|(_, start_byte)| *start_byte < first.start_byte)
                .or_else(|| anchors.get(&(last.end_row + 1)))
                .map(|(id, _)| *id);

            if let Some(id) = target {
                map.groups.entry(id).or_default().push(text);
            }
        }
        map
    }

    /// The comment groups attached to `node`, if any.
    pub fn groups_for(&self, node: Node) -> Option<&[String]> {
        self.groups.get(&node.id()).map(Vec::as_slice)
    }
}

struct CommentNode {
    start_row: usize,
    end_row: usize,
    start_byte: usize,
    text: String,
}

fn index_tree(
    node: Node,
    source: &str,
    comments: &mut Vec<CommentNode>,
    anchors: &mut HashMap<usize, (usize, usize)>,
) {
    if node.kind() == "comment" {
        comments.push(CommentNode {
            start_row: node.start_position().row,
            end_row: node.end_position().row,
            start_byte: node.start_byte(),
            text: node.utf8_text(source.as_bytes()).unwrap_or("").to_string(),
        });
        return;
    }

    // The first named node seen for a row is the outermost one starting
    // there; the file root itself is not an anchor.
    if node.is_named() && node.kind() != "source_file" {
        anchors
            .entry(node.start_position().row)
            .or_insert((node.id(), node.start_byte()));
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        index_tree(child, source, comments, anchors);
    }
}

/// Groups consecutive comments: a comment starting on the line right
/// after the previous one continues its group.
fn group_comments(comments: &[CommentNode]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (i, comment) in comments.iter().enumerate() {
        match groups.last_mut() {
            Some(group)
                if comment.start_row == comments[*group.last().unwrap()].end_row + 1 =>
            {
                group.push(i);
            }
            _ => groups.push(vec![i]),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_file;
    use std::path::PathBuf;

    fn with_map<R>(source: &str, f: impl FnOnce(Node, &CommentMap) -> R) -> R {
        let file = parse_file(PathBuf::from("test.go"), source.to_string()).unwrap();
        let root = file.tree.root_node();
        let map = CommentMap::build(root, source);
        f(root, &map)
    }

    fn find_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
        if node.kind() == kind {
            return Some(node);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if let Some(found) = find_kind(child, kind) {
                return Some(found);
            }
        }
        None
    }

    #[test]
    fn lead_comment_attaches_to_next_statement() {
        let source = "package main\n\nfunc main() {\n\t// #nosec\n\tx := 1\n\t_ = x\n}\n";
        with_map(source, |root, map| {
            let decl = find_kind(root, "short_var_declaration").unwrap();
            let groups = map.groups_for(decl).unwrap();
            assert_eq!(groups, ["// #nosec"]);
        });
    }

    #[test]
    fn trailing_comment_attaches_to_its_statement() {
        let source = "package main\n\nfunc main() {\n\tx := 1 // #nosec\n\t_ = x\n}\n";
        with_map(source, |root, map| {
            let decl = find_kind(root, "short_var_declaration").unwrap();
            let groups = map.groups_for(decl).unwrap();
            assert_eq!(groups, ["// #nosec"]);
        });
    }

    #[test]
    fn comment_before_function_covers_the_declaration() {
        let source = "package main\n\n// #nosec G701\nfunc conv() {\n}\n";
        with_map(source, |root, map| {
            let decl = find_kind(root, "function_declaration").unwrap();
            let groups = map.groups_for(decl).unwrap();
            assert_eq!(groups, ["// #nosec G701"]);
        });
    }

    #[test]
    fn stacked_comments_form_one_group() {
        let source = "package main\n\n// first\n// second\nfunc f() {}\n";
        with_map(source, |root, map| {
            let decl = find_kind(root, "function_declaration").unwrap();
            let groups = map.groups_for(decl).unwrap();
            assert_eq!(groups.len(), 1);
            assert_eq!(groups[0], "// first\n// second");
        });
    }

    #[test]
    fn unrelated_statement_has_no_groups() {
        let source = "package main\n\n// note\nfunc f() {\n\ty := 2\n\t_ = y\n}\n";
        with_map(source, |root, map| {
            let decl = find_kind(root, "short_var_declaration").unwrap();
            assert!(map.groups_for(decl).is_none());
        });
    }
}
