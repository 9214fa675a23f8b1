//! Candidate locator
//!
//! Ranks the elements of a DOM snapshot that plausibly activate a control
//! labelled with some text. Nothing here touches a browser: the snapshot is
//! taken by [`crate::clicker`], which then tries the candidates in order.
//!
//! Strategies run in a fixed order and contribute candidates in that order:
//!
//! 1. exact text match, lifted to its nearest clickable ancestor
//! 2. CSS class fingerprint whose text contains the label
//! 3. icon-class marker lifted to its actionable ancestor
//! 4. last resort: shortest text-containing element, a dialog submit button,
//!    or a pointer event at an offset from a located label

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::types::Rect;

/// How far up the tree a clickable ancestor is searched for
pub const CLICKABLE_ANCESTOR_DEPTH: usize = 10;

/// One element of a page snapshot, in document order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomNode {
    pub index: usize,
    pub parent: Option<usize>,
    /// Lowercase tag name
    pub tag: String,
    /// `textContent` with whitespace collapsed, truncated
    pub text: String,
    pub class_name: String,
    pub role: Option<String>,
    pub has_onclick: bool,
    pub input_type: Option<String>,
    /// Inside a `[data-provider="google"]` block
    pub in_provider_block: bool,
    /// Inside a modal or `[role="dialog"]`
    pub in_dialog: bool,
    pub visible: bool,
    pub rect: Rect,
}

impl DomNode {
    pub fn has_class(&self, class: &str) -> bool {
        self.class_name.split_whitespace().any(|c| c == class)
    }

    /// Buttons, links, `role="button"`, button-ish classes and `onclick` handlers
    pub fn is_clickable(&self) -> bool {
        let class = self.class_name.to_lowercase();
        matches!(self.tag.as_str(), "button" | "a")
            || self.role.as_deref() == Some("button")
            || class.contains("button")
            || class.contains("btn")
            || self.has_onclick
    }

    fn describe(&self) -> String {
        let classes: Vec<&str> = self.class_name.split_whitespace().take(3).collect();
        let mut out = self.tag.clone();
        if !classes.is_empty() {
            out.push('.');
            out.push_str(&classes.join("."));
        }
        if !self.text.is_empty() {
            let text: String = self.text.chars().take(40).collect();
            out.push_str(&format!(" \"{text}\""));
        }
        out
    }
}

/// What the caller wants to activate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Target {
    pub label: String,
    /// Space-separated class lists that identify the control's container
    pub class_fingerprints: Vec<String>,
    /// Icon classes drawn inside the control
    pub icon_markers: Vec<String>,
    /// Fall back to the submit button of an open dialog
    pub dialog_submit: bool,
    /// Fall back to a pointer event at this offset from the label's bottom centre
    pub pointer_offset: Option<(f64, f64)>,
}

impl Target {
    pub fn text(label: &str) -> Self {
        Target {
            label: label.to_string(),
            ..Default::default()
        }
    }

    pub fn with_class_fingerprint(mut self, classes: &str) -> Self {
        self.class_fingerprints.push(classes.to_string());
        self
    }

    pub fn with_icon(mut self, marker: &str) -> Self {
        self.icon_markers.push(marker.to_string());
        self
    }

    pub fn with_dialog_submit(mut self) -> Self {
        self.dialog_submit = true;
        self
    }

    pub fn with_pointer_offset(mut self, dx: f64, dy: f64) -> Self {
        self.pointer_offset = Some((dx, dy));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ExactText,
    ClassFingerprint,
    IconMarker,
    TextContains,
    DialogSubmit,
    PointerOffset,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::ExactText => "exact text",
            Strategy::ClassFingerprint => "class fingerprint",
            Strategy::IconMarker => "icon marker",
            Strategy::TextContains => "text contains",
            Strategy::DialogSubmit => "dialog submit",
            Strategy::PointerOffset => "pointer offset",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activation {
    /// Call `click()` on the snapshot element with this index
    Click { node: usize },
    /// Dispatch a click at viewport coordinates
    PointerAt { x: f64, y: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub strategy: Strategy,
    pub activation: Activation,
    pub description: String,
}

/// Collapse whitespace and lowercase
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

struct Tree<'a> {
    nodes: &'a [DomNode],
    by_index: HashMap<usize, &'a DomNode>,
}

impl<'a> Tree<'a> {
    fn new(nodes: &'a [DomNode]) -> Self {
        Tree {
            nodes,
            by_index: nodes.iter().map(|n| (n.index, n)).collect(),
        }
    }

    fn get(&self, index: usize) -> Option<&'a DomNode> {
        self.by_index.get(&index).copied()
    }

    /// The node itself, then its ancestors, at most `depth` steps up
    fn lineage(&self, node: &'a DomNode, depth: usize) -> impl Iterator<Item = &'a DomNode> + '_ {
        std::iter::successors(Some(node), |n| n.parent.and_then(|p| self.get(p)))
            .take(depth.saturating_add(1))
    }

    /// Nearest clickable node at or above `node`, else `node` itself
    fn lift(&self, node: &'a DomNode, depth: usize) -> &'a DomNode {
        self.lineage(node, depth)
            .find(|n| n.is_clickable())
            .unwrap_or(node)
    }

    /// Matches that contain no other match beneath them
    fn innermost(&self, matches: Vec<&'a DomNode>) -> Vec<&'a DomNode> {
        let matched: HashSet<usize> = matches.iter().map(|n| n.index).collect();
        let mut outer = HashSet::new();
        for node in &matches {
            for ancestor in self.lineage(node, usize::MAX).skip(1) {
                if matched.contains(&ancestor.index) {
                    outer.insert(ancestor.index);
                }
            }
        }
        matches
            .into_iter()
            .filter(|n| !outer.contains(&n.index))
            .collect()
    }

    fn usable(&self) -> impl Iterator<Item = &'a DomNode> + '_ {
        self.nodes.iter().filter(|n| !n.in_provider_block)
    }
}

struct Ranking {
    seen_nodes: HashSet<usize>,
    candidates: Vec<Candidate>,
}

impl Ranking {
    fn push_node(&mut self, strategy: Strategy, node: &DomNode) {
        if self.seen_nodes.insert(node.index) {
            self.candidates.push(Candidate {
                strategy,
                activation: Activation::Click { node: node.index },
                description: node.describe(),
            });
        }
    }

    /// Visible nodes first, keeping relative order
    fn push_all<'a>(&mut self, strategy: Strategy, nodes: impl IntoIterator<Item = &'a DomNode>) {
        let (visible, hidden): (Vec<_>, Vec<_>) = nodes.into_iter().partition(|n| n.visible);
        for node in visible.into_iter().chain(hidden) {
            self.push_node(strategy, node);
        }
    }
}

/// Rank every element of `nodes` that could activate `target`, best first
pub fn rank_candidates(nodes: &[DomNode], target: &Target) -> Vec<Candidate> {
    let tree = Tree::new(nodes);
    let label = normalize(&target.label);
    let mut ranking = Ranking {
        seen_nodes: HashSet::new(),
        candidates: Vec::new(),
    };
    if label.is_empty() {
        return ranking.candidates;
    }

    // 1. exact text
    let exact = tree.innermost(tree.usable().filter(|n| normalize(&n.text) == label).collect());
    ranking.push_all(
        Strategy::ExactText,
        exact.iter().map(|n| tree.lift(n, CLICKABLE_ANCESTOR_DEPTH)),
    );

    // 2. class fingerprint
    for fingerprint in &target.class_fingerprints {
        let wanted: Vec<&str> = fingerprint.split_whitespace().collect();
        let hits: Vec<&DomNode> = tree
            .usable()
            .filter(|n| !wanted.is_empty() && wanted.iter().all(|c| n.has_class(c)))
            .filter(|n| normalize(&n.text).contains(&label))
            .map(|n| tree.lift(n, 5))
            .collect();
        ranking.push_all(Strategy::ClassFingerprint, hits);
    }

    // 3. icon marker; icons whose control mentions the label come first
    for marker in &target.icon_markers {
        let mut lifted: Vec<&DomNode> = tree
            .usable()
            .filter(|n| n.has_class(marker))
            .map(|icon| tree.lift(icon, CLICKABLE_ANCESTOR_DEPTH))
            .collect();
        lifted.sort_by_key(|n| !normalize(&n.text).contains(&label));
        ranking.push_all(Strategy::IconMarker, lifted);
    }

    // 4a. shortest element whose text contains the label
    let mut containing = tree.innermost(
        tree.usable()
            .filter(|n| n.visible && normalize(&n.text).contains(&label))
            .collect(),
    );
    containing.sort_by_key(|n| n.text.len());
    ranking.push_all(
        Strategy::TextContains,
        containing.iter().map(|n| tree.lift(n, CLICKABLE_ANCESTOR_DEPTH)),
    );

    // 4b. dialog submit
    if target.dialog_submit {
        let buttons: Vec<&DomNode> = tree
            .usable()
            .filter(|n| n.in_dialog && (n.tag == "button" || n.role.as_deref() == Some("button")))
            .collect();
        let (submits, others): (Vec<&DomNode>, Vec<&DomNode>) = buttons.into_iter().partition(|b| {
            normalize(&b.text).contains("create") || b.input_type.as_deref() == Some("submit")
        });
        ranking.push_all(Strategy::DialogSubmit, submits);
        // The confirm button is usually last
        ranking.push_all(Strategy::DialogSubmit, others.into_iter().rev().take(1));
    }

    // 4c. pointer offset from the label
    if let Some((dx, dy)) = target.pointer_offset
        && let Some(anchor) = find_label(nodes, &target.label)
    {
        ranking.candidates.push(Candidate {
            strategy: Strategy::PointerOffset,
            activation: Activation::PointerAt {
                x: anchor.rect.center_x() + dx,
                y: anchor.rect.bottom() + dy,
            },
            description: format!("{dx:+}/{dy:+}px from {}", anchor.describe()),
        });
    }

    ranking.candidates
}

/// The element that best represents a visible text label: a `<label>` whose
/// text equals `text`, else the innermost element with that exact text
pub fn find_label<'a>(nodes: &'a [DomNode], text: &str) -> Option<&'a DomNode> {
    let tree = Tree::new(nodes);
    let wanted = normalize(text);
    let exact: Vec<&DomNode> = tree
        .usable()
        .filter(|n| normalize(&n.text) == wanted)
        .collect();

    if let Some(label) = exact.iter().find(|n| n.tag == "label").copied() {
        return Some(label);
    }
    tree.innermost(exact).into_iter().find(|n| n.visible)
}

#[cfg(test)]
#[path = "locator_test.rs"]
mod locator_test;
