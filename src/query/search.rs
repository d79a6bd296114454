//! Tree searches
//!
//! All walks are iterative pre-order traversals over the arena, mirroring
//! the stack-based descendant iterators of the DOM module.

use tracing::trace;

use super::criteria::{CompiledQuery, Criterion, Property, Test};
use crate::dom::{NodeId, NodeKind, NodeRef, NodeTree};

/// Find the Text leaf under `from` covering character `offset`
///
/// Subtrees whose range cannot hold `offset` are not entered.
pub fn search_offset(from: NodeRef<'_>, offset: usize) -> Option<NodeRef<'_>> {
    let tree = from.tree();
    let mut stack = vec![from.id()];

    while let Some(id) = stack.pop() {
        let Some(node) = tree.node(id) else {
            continue;
        };
        if offset < node.offset() || offset >= node.end() {
            continue;
        }
        if node.is_text() {
            return Some(node);
        }
        stack.extend(tree.get(id).into_iter().flat_map(|n| n.children().iter().rev()));
    }
    None
}

/// Text leaves under `from` containing any of `candidates`, in document order
///
/// Subtrees rooted at a node equal to an `exclude` node (same offset) are
/// skipped. At most `cap` leaves are returned.
pub fn search_text<'t, S: AsRef<str>>(
    from: NodeRef<'t>,
    candidates: &[S],
    exclude: &[NodeId],
    cap: Option<usize>,
) -> Vec<NodeRef<'t>> {
    let mut results = Vec::new();
    collect_text(from, candidates, exclude, cap, &mut results);
    results
}

fn collect_text<'t, S: AsRef<str>>(
    from: NodeRef<'t>,
    candidates: &[S],
    exclude: &[NodeId],
    cap: Option<usize>,
    results: &mut Vec<NodeRef<'t>>,
) {
    let tree = from.tree();
    let mut stack = vec![from.id()];

    while let Some(id) = stack.pop() {
        if cap.is_some_and(|cap| results.len() >= cap) {
            return;
        }
        let Some(node) = tree.node(id) else {
            continue;
        };
        if is_excluded(node, exclude) {
            continue;
        }
        match node.text() {
            Some(text) => {
                if candidates.iter().any(|c| text.contains(c.as_ref())) {
                    results.push(node);
                }
            }
            None => stack.extend(tree.get(id).into_iter().flat_map(|n| n.children().iter().rev())),
        }
    }
}

/// Node equality is offset equality, so an excluded node also hides every
/// node starting at the same offset
#[inline]
fn is_excluded(node: NodeRef<'_>, exclude: &[NodeId]) -> bool {
    let tree = node.tree();
    exclude
        .iter()
        .filter_map(|&id| tree.node(id))
        .any(|excluded| excluded == node)
}

/// Outcome of evaluating one Control against a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Match,
    Miss,
    /// A negated criterion matched; the whole search is void
    Veto,
}

fn evaluate(node: NodeRef<'_>, criteria: &[Criterion]) -> Verdict {
    let mut matched = true;
    for criterion in criteria {
        let hit = criterion
            .key
            .property
            .matches(node, criterion.key.test, &criterion.values);
        if criterion.key.test.is_veto() {
            if hit {
                return Verdict::Veto;
            }
        } else if !hit {
            matched = false;
        }
    }
    if matched {
        Verdict::Match
    } else {
        Verdict::Miss
    }
}

/// Run a structured search
///
/// Matching Controls are reported without descending into them; when the
/// query carries `in_text` candidates, the matching text leaves inside the
/// Control are reported instead. With `in_prevText` candidates a matching
/// Control is reported only if its previous Text leaf contains one, and is
/// not descended either way. A matching negated criterion on any visited
/// Control empties the whole result.
pub fn search_nodes<'t>(tree: &'t NodeTree, query: &CompiledQuery) -> Vec<NodeRef<'t>> {
    let mut stack: Vec<NodeId> = if query.roots.is_empty() {
        tree.root().map(|r| r.id()).into_iter().collect()
    } else {
        query.roots.iter().rev().copied().collect()
    };

    let cap = query.max_results;
    let mut results = Vec::new();
    let mut visited = 0usize;

    while let Some(id) = stack.pop() {
        if cap.is_some_and(|cap| results.len() >= cap) {
            break;
        }
        let Some(node) = tree.node(id) else {
            continue;
        };
        if is_excluded(node, &query.exclude) {
            continue;
        }
        visited += 1;

        match node.kind() {
            NodeKind::Text => continue,
            NodeKind::Format => {}
            NodeKind::Control => match evaluate(node, &query.criteria) {
                Verdict::Veto => {
                    trace!(visited, node = ?node, "search vetoed");
                    return Vec::new();
                }
                Verdict::Match => {
                    match (&query.text, &query.prev_text) {
                        (Some(candidates), _) => {
                            let remaining = cap.map(|cap| cap - results.len());
                            collect_text(node, candidates.as_slice(), &query.exclude, remaining, &mut results)
                        }
                        (None, Some(candidates)) => {
                            if Property::PrevText.matches(node, Test::In, candidates) {
                                results.push(node);
                            }
                        }
                        (None, None) => results.push(node),
                    }
                    continue;
                }
                Verdict::Miss => {}
            },
        }
        stack.extend(node_children(tree, id));
    }

    trace!(visited, results = results.len(), "structured search");
    results
}

#[inline]
fn node_children(tree: &NodeTree, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    tree.get(id)
        .into_iter()
        .flat_map(|n| n.children().iter().rev().copied())
}

/// Run several structured searches over the same tree
#[cfg(feature = "parallel")]
pub fn search_many<'t>(tree: &'t NodeTree, queries: &[CompiledQuery]) -> Vec<Vec<NodeRef<'t>>> {
    use rayon::prelude::*;

    queries
        .par_iter()
        .map(|query| search_nodes(tree, query))
        .collect()
}

/// Run several structured searches over the same tree
#[cfg(not(feature = "parallel"))]
pub fn search_many<'t>(tree: &'t NodeTree, queries: &[CompiledQuery]) -> Vec<Vec<NodeRef<'t>>> {
    queries.iter().map(|query| search_nodes(tree, query)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::criteria::{CriteriaCache, Query};
    use crate::sax::build_tree;
    use std::num::NonZeroUsize;

    const PAGE: &str = concat!(
        r#"<control role="document" nodeName="BODY">"#,
        r#"<control role="navigation" HTMLAttrib:className="menu top">"#,
        r#"<control role="link" name="Home"><text>Home</text></control>"#,
        r#"<control role="link" name="News"><text>News</text></control>"#,
        r#"</control>"#,
        r#"<control role="paragraph"><text>Welcome home</text></control>"#,
        r#"<control role="link" HTMLAttrib:className="hidden"><text>Secret</text></control>"#,
        r#"</control>"#,
    );

    fn run<'t>(tree: &'t NodeTree, query: Query) -> Vec<NodeRef<'t>> {
        let cache = CriteriaCache::new(NonZeroUsize::new(16).unwrap());
        search_nodes(tree, &query.compile(&cache))
    }

    #[test]
    fn test_search_offset() {
        let tree = build_tree(PAGE).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(search_offset(root, 0).unwrap().text(), Some("Home"));
        assert_eq!(search_offset(root, 5).unwrap().text(), Some("News"));
        assert_eq!(search_offset(root, 8).unwrap().text(), Some("Welcome home"));
        assert!(search_offset(root, root.end()).is_none());
    }

    #[test]
    fn test_search_text_cap_and_exclude() {
        let tree = build_tree(PAGE).unwrap();
        let root = tree.root().unwrap();
        let hits = search_text(root, &["e"], &[], None);
        assert_eq!(hits.len(), 4);

        let hits = search_text(root, &["e"], &[], Some(2));
        assert_eq!(hits.len(), 2);

        let paragraph = root.children().nth(1).unwrap();
        let hits = search_text(root, &["e"], &[paragraph.id()], None);
        let texts: Vec<_> = hits.iter().filter_map(|n| n.text()).collect();
        assert_eq!(texts, vec!["Home", "News", "Secret"]);
    }

    #[test]
    fn test_eq_role_stops_at_match() {
        let tree = build_tree(PAGE).unwrap();
        let links = run(&tree, Query::new().criterion("eq_role", ["link"]));
        let names: Vec<_> = links.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["Home", "News", ""]);

        let navs = run(&tree, Query::new().criterion("in_className", ["menu"]));
        assert_eq!(navs.len(), 1);
        assert_eq!(navs[0].role(), "navigation");
    }

    #[test]
    fn test_conjunction_with_text() {
        let tree = build_tree(PAGE).unwrap();
        let hits = run(
            &tree,
            Query::new()
                .criterion("eq_role", ["link"])
                .criterion("in_text", ["Home"]),
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text(), Some("Home"));
    }

    #[test]
    fn test_prev_text() {
        let tree = build_tree(PAGE).unwrap();
        let hits = run(
            &tree,
            Query::new()
                .criterion("eq_role", ["link"])
                .criterion("in_prevText", ["Home"]),
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name(), "News");
    }

    #[test]
    fn test_prev_text_miss_does_not_descend() {
        let tree = build_tree(concat!(
            r#"<control role="document">"#,
            r#"<control role="section" name="outer">"#,
            r#"<control role="paragraph"><text>Menu</text></control>"#,
            r#"<control role="section" name="inner"><text>Items</text></control>"#,
            r#"</control>"#,
            r#"</control>"#,
        ))
        .unwrap();
        let sections = || {
            Query::new()
                .criterion("eq_role", ["section"])
                .criterion("in_prevText", ["Menu"])
        };
        assert!(run(&tree, sections()).is_empty());

        let outer = tree.root().unwrap().children().next().unwrap();
        let inner = outer.children().nth(1).unwrap();
        let hits = run(&tree, sections().root(inner.id()));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name(), "inner");

        let wildcard = Query::new()
            .criterion("eq_role", ["section"])
            .criterion("in_prevText", ["Me*"])
            .root(inner.id());
        assert!(run(&tree, wildcard).is_empty());
    }

    #[test]
    fn test_exclusion_uses_offset_equality() {
        let tree = build_tree(PAGE).unwrap();
        let root = tree.root().unwrap();
        let news = root.children().next().unwrap().children().nth(1).unwrap();
        let news_format = news.children().next().unwrap();
        assert_eq!(news, news_format);

        let hits = run(&tree, Query::new().criterion("eq_role", ["link"]).exclude(news_format.id()));
        let names: Vec<_> = hits.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["Home", ""]);

        let texts: Vec<_> = search_text(root, &["e"], &[news_format.id()], None)
            .iter()
            .filter_map(|n| n.text())
            .collect();
        assert_eq!(texts, vec!["Home", "Welcome home", "Secret"]);

        // The navigation Control starts where the root does
        let nav = root.children().next().unwrap();
        assert!(run(&tree, Query::new().criterion("eq_role", ["link"]).exclude(nav.id())).is_empty());
    }

    #[test]
    fn test_not_in_short_circuits() {
        let tree = build_tree(PAGE).unwrap();
        let hits = run(
            &tree,
            Query::new()
                .criterion("eq_role", ["link"])
                .criterion("notIn_className", ["hidden"]),
        );
        assert!(hits.is_empty());

        let hits = run(&tree, Query::new().criterion("notEq_role", ["banner"]));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_class_name_is_token_wise() {
        let tree = build_tree(PAGE).unwrap();
        assert_eq!(run(&tree, Query::new().criterion("eq_className", ["top"])).len(), 1);
        assert!(run(&tree, Query::new().criterion("eq_className", ["menu top"])).is_empty());
    }

    #[test]
    fn test_roots_exclude_and_cap() {
        let tree = build_tree(PAGE).unwrap();
        let root = tree.root().unwrap();
        let nav = root.children().next().unwrap();

        let hits = run(&tree, Query::new().criterion("eq_role", ["link"]).root(nav.id()));
        assert_eq!(hits.len(), 2);

        let secret = root.children().nth(2).unwrap();
        let hits = run(&tree, Query::new().criterion("eq_role", ["link"]).exclude(secret.id()));
        assert_eq!(hits.len(), 2);

        let hits = run(&tree, Query::new().criterion("eq_role", ["link"]).max_results(1));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name(), "Home");

        let hits = run(&tree, Query::new().criterion("eq_role", ["link"]).max_results(0));
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_search_many() {
        let tree = build_tree(PAGE).unwrap();
        let cache = CriteriaCache::new(NonZeroUsize::new(16).unwrap());
        let queries = [
            Query::new().criterion("eq_role", ["paragraph"]).compile(&cache),
            Query::new().criterion("eq_name", ["News"]).compile(&cache),
        ];
        let results = search_many(&tree, &queries);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0][0].role(), "paragraph");
        assert_eq!(results[1][0].name(), "News");
    }
}
