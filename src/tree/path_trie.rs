use std::sync::RwLock;

/// A trie over path segments, tracking which paths carry a quota (§4.2).
///
/// Segments, not bytes, are the unit of storage: `/a/ab` and `/a/abc` are siblings of
/// `/a`, not of each other.
pub struct PathTrie {
    root: RwLock<Node>,
}

#[derive(Default)]
struct Node {
    terminal: bool,
    children: std::collections::HashMap<String, Node>,
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl PathTrie {
    pub fn new() -> PathTrie {
        PathTrie {
            root: RwLock::new(Node::default()),
        }
    }

    pub fn add_path(&self, path: &str) {
        let mut root = self.root.write().unwrap();
        let mut node = &mut *root;
        for seg in segments(path) {
            node = node.children.entry(seg.to_owned()).or_insert_with(Node::default);
        }
        node.terminal = true;
    }

    pub fn delete_path(&self, path: &str) {
        let mut root = self.root.write().unwrap();
        delete_rec(&mut root, &segments(path));
    }

    /// Longest prefix of `path` (at segment granularity) that was added via `add_path`,
    /// or `""` if none.
    pub fn find_max_prefix(&self, path: &str) -> String {
        let root = self.root.read().unwrap();
        let mut node = &*root;
        let mut matched = Vec::new();
        let mut best: Vec<String> = Vec::new();

        for seg in segments(path) {
            match node.children.get(seg) {
                Some(child) => {
                    matched.push(seg.to_owned());
                    node = child;
                    if node.terminal {
                        best = matched.clone();
                    }
                }
                None => break,
            }
        }

        if best.is_empty() {
            String::new()
        } else {
            format!("/{}", best.join("/"))
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        let root = self.root.read().unwrap();
        let mut node = &*root;
        for seg in segments(path) {
            match node.children.get(seg) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.terminal
    }

    pub fn clear(&self) {
        *self.root.write().unwrap() = Node::default();
    }
}

/// Returns true if `node` has become empty (no terminal marker, no children) and can
/// be pruned from its parent.
fn delete_rec(node: &mut Node, segs: &[&str]) -> bool {
    if segs.is_empty() {
        node.terminal = false;
    } else if let Some(child) = node.children.get_mut(segs[0]) {
        if delete_rec(child, &segs[1..]) {
            node.children.remove(segs[0]);
        }
    }
    !node.terminal && node.children.is_empty()
}

impl Default for PathTrie {
    fn default() -> Self {
        PathTrie::new()
    }
}
