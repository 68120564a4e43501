//! Structural diff engine.
//!
//! This module compares two canonical specification trees leaf by leaf and
//! reports which values changed. The engine only builds a [`DiffReport`];
//! rendering it is left to the CLI formatter.

use serde::Serialize;
use tracing::trace;

use crate::canonical::{CanonicalValue, SpecPath};
use crate::error::DiffError;

/// Engine for comparing canonical trees.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

/// One compared (or printed) leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffNode {
    /// Location of the leaf.
    pub path: SpecPath,
    /// Value on the current (observed) side.
    pub current: Option<String>,
    /// Value on the expected (desired) side.
    pub expected: Option<String>,
    /// Whether the two sides differ.
    pub changed: bool,
}

/// Leaves of a comparison, in pre-order of the expected tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    /// Every compared leaf.
    nodes: Vec<DiffNode>,
    /// True if at least one leaf changed.
    any_changed: bool,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Compares `current` against `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::ShapeMismatch`] when the trees disagree on shape
    /// at some path. Such trees come from different schemas and cannot be
    /// reconciled.
    pub fn diff(
        &self,
        current: &CanonicalValue,
        expected: &CanonicalValue,
    ) -> Result<DiffReport, DiffError> {
        let mut report = DiffReport::default();
        Self::walk(&SpecPath::root(), current, expected, &mut report)?;
        trace!(
            "Compared {} leaves, {} changed",
            report.nodes.len(),
            report.changed().count()
        );
        Ok(report)
    }

    /// Lists every public leaf of a tree, e.g. to show a new entity in full.
    #[must_use]
    pub fn print_spec(&self, spec: &CanonicalValue) -> Vec<DiffNode> {
        let mut nodes = Vec::new();
        Self::collect(&SpecPath::root(), spec, &mut nodes);
        nodes
    }

    fn walk(
        path: &SpecPath,
        current: &CanonicalValue,
        expected: &CanonicalValue,
        report: &mut DiffReport,
    ) -> Result<(), DiffError> {
        match (current, expected) {
            (
                CanonicalValue::Scalar { kind: ck, text: ct },
                CanonicalValue::Scalar { kind: ek, text: et },
            ) if ck == ek => {
                report.push(DiffNode {
                    path: path.clone(),
                    current: Some(ct.clone()),
                    expected: Some(et.clone()),
                    changed: ct != et,
                });
                Ok(())
            }

            (CanonicalValue::Sequence(c), CanonicalValue::Sequence(e)) => {
                for i in 0..c.len().max(e.len()) {
                    let child = path.index(i);
                    match (c.get(i), e.get(i)) {
                        (Some(cv), Some(ev)) => Self::walk(&child, cv, ev, report)?,
                        (None, Some(ev)) => Self::walk(&child, &ev.zero(), ev, report)?,
                        (Some(cv), None) => Self::walk(&child, cv, &cv.zero(), report)?,
                        (None, None) => {}
                    }
                }
                Ok(())
            }

            (CanonicalValue::Mapping(c), CanonicalValue::Mapping(e)) => {
                for (key, cv) in c {
                    let child = path.key(key);
                    match e.get(key) {
                        Some(ev) => Self::walk(&child, cv, ev, report)?,
                        None => Self::walk(&child, cv, &cv.zero(), report)?,
                    }
                }
                for (key, ev) in e.iter().filter(|(k, _)| !c.contains_key(*k)) {
                    Self::walk(&path.key(key), &ev.zero(), ev, report)?;
                }
                Ok(())
            }

            (CanonicalValue::Optional(c), CanonicalValue::Optional(e)) => match (c, e) {
                (None, None) => Ok(()),
                (Some(cv), Some(ev)) => Self::walk(path, cv, ev, report),
                (None, Some(ev)) => Self::walk(path, &ev.zero(), ev, report),
                (Some(cv), None) => Self::walk(path, cv, &cv.zero(), report),
            },

            (CanonicalValue::Record(c), CanonicalValue::Record(e)) => {
                let same_schema = c.len() == e.len()
                    && c
                        .iter()
                        .zip(e)
                        .all(|(cf, ef)| cf.label == ef.label && cf.visibility == ef.visibility);
                if !same_schema {
                    return Err(Self::mismatch(path, current, expected));
                }
                for (cf, ef) in c.iter().zip(e).filter(|(cf, _)| cf.is_public()) {
                    Self::walk(&path.field(&cf.label), &cf.value, &ef.value, report)?;
                }
                Ok(())
            }

            _ => Err(Self::mismatch(path, current, expected)),
        }
    }

    fn collect(path: &SpecPath, spec: &CanonicalValue, nodes: &mut Vec<DiffNode>) {
        match spec {
            CanonicalValue::Scalar { text, .. } => nodes.push(DiffNode {
                path: path.clone(),
                current: Some(text.clone()),
                expected: None,
                changed: false,
            }),
            CanonicalValue::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    Self::collect(&path.index(i), item, nodes);
                }
            }
            CanonicalValue::Mapping(entries) => {
                for (key, value) in entries {
                    Self::collect(&path.key(key), value, nodes);
                }
            }
            CanonicalValue::Optional(inner) => {
                if let Some(value) = inner {
                    Self::collect(path, value, nodes);
                }
            }
            CanonicalValue::Record(fields) => {
                for field in fields.iter().filter(|f| f.is_public()) {
                    Self::collect(&path.field(&field.label), &field.value, nodes);
                }
            }
        }
    }

    fn mismatch(path: &SpecPath, current: &CanonicalValue, expected: &CanonicalValue) -> DiffError {
        let path = if path.is_root() {
            String::from("<root>")
        } else {
            path.to_string()
        };
        DiffError::ShapeMismatch {
            path,
            current: current.shape(),
            expected: expected.shape(),
        }
    }
}

impl DiffReport {
    fn push(&mut self, node: DiffNode) {
        self.any_changed |= node.changed;
        self.nodes.push(node);
    }

    /// Returns true if any leaf changed.
    #[must_use]
    pub const fn any_changed(&self) -> bool {
        self.any_changed
    }

    /// Every compared leaf, changed or not.
    #[must_use]
    pub fn nodes(&self) -> &[DiffNode] {
        &self.nodes
    }

    /// Only the leaves that changed.
    pub fn changed(&self) -> impl Iterator<Item = &DiffNode> {
        self.nodes.iter().filter(|n| n.changed)
    }

    /// Number of compared leaves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if nothing was compared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl std::fmt::Display for DiffNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current.as_deref().unwrap_or_default();
        match &self.expected {
            Some(expected) => write!(f, "{}: \"{current}\" => \"{expected}\"", self.path),
            None => write!(f, "{}: \"{current}\"", self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::Field;

    fn text(s: &str) -> CanonicalValue {
        CanonicalValue::text(s)
    }

    fn map(entries: &[(&str, &str)]) -> CanonicalValue {
        CanonicalValue::mapping(entries.iter().map(|(k, v)| (*k, text(v))))
    }

    fn port(target: u32) -> CanonicalValue {
        CanonicalValue::record(vec![
            Field::public("Protocol", text("tcp")),
            Field::public("TargetPort", CanonicalValue::integer(target)),
        ])
    }

    fn service(image: &str, replicas: u64) -> CanonicalValue {
        CanonicalValue::record(vec![
            Field::public("Image", text(image)),
            Field::public(
                "Replicas",
                CanonicalValue::optional(Some(CanonicalValue::integer(replicas))),
            ),
            Field::public("Ports", CanonicalValue::sequence([port(80)])),
            Field::public("Labels", map(&[("tier", "web")])),
        ])
    }

    fn rendered(report: &DiffReport) -> Vec<String> {
        report.changed().map(ToString::to_string).collect()
    }

    #[test]
    fn test_identical_trees_do_not_differ() {
        let spec = service("nginx:1", 2);
        let report = DiffEngine::new().diff(&spec, &spec).expect("diff");

        assert!(!report.any_changed());
        assert_eq!(report.len(), 5);
        assert!(report.nodes().iter().all(|n| n.current == n.expected));
    }

    #[test]
    fn test_scalar_change() {
        let report = DiffEngine::new()
            .diff(&service("nginx:1", 2), &service("nginx:2", 2))
            .expect("diff");

        assert!(report.any_changed());
        assert_eq!(rendered(&report), [r#".Image: "nginx:1" => "nginx:2""#]);
    }

    #[test]
    fn test_map_absence_is_symmetric() {
        let engine = DiffEngine::new();

        let added = engine.diff(&map(&[]), &map(&[("k", "v")])).expect("diff");
        assert_eq!(added.len(), 1);
        let node = &added.nodes()[0];
        assert_eq!(node.path.to_string(), ".k");
        assert_eq!(node.current.as_deref(), Some(""));
        assert_eq!(node.expected.as_deref(), Some("v"));
        assert!(node.changed);

        let removed = engine.diff(&map(&[("k", "v")]), &map(&[])).expect("diff");
        assert_eq!(removed.len(), 1);
        let node = &removed.nodes()[0];
        assert_eq!(node.path.to_string(), ".k");
        assert_eq!(node.current.as_deref(), Some("v"));
        assert_eq!(node.expected.as_deref(), Some(""));
    }

    #[test]
    fn test_map_keys_current_first_then_expected_only() {
        let report = DiffEngine::new()
            .diff(&map(&[("b", "1"), ("d", "1")]), &map(&[("a", "1"), ("b", "2")]))
            .expect("diff");

        let paths: Vec<String> = report.nodes().iter().map(|n| n.path.to_string()).collect();
        assert_eq!(paths, [".b", ".d", ".a"]);
    }

    #[test]
    fn test_sequence_tail_is_whole_subtree() {
        let current = CanonicalValue::sequence([port(80)]);
        let expected = CanonicalValue::sequence([port(80), port(443)]);
        let report = DiffEngine::new().diff(&current, &expected).expect("diff");

        assert_eq!(
            rendered(&report),
            [
                r#"[1].Protocol: "" => "tcp""#,
                r#"[1].TargetPort: "0" => "443""#,
            ]
        );

        let shrunk = DiffEngine::new().diff(&expected, &current).expect("diff");
        assert_eq!(
            rendered(&shrunk),
            [
                r#"[1].Protocol: "tcp" => """#,
                r#"[1].TargetPort: "443" => "0""#,
            ]
        );
    }

    #[test]
    fn test_sequence_reorder_is_positional() {
        let current = CanonicalValue::sequence([text("a"), text("b")]);
        let expected = CanonicalValue::sequence([text("b"), text("a")]);
        let report = DiffEngine::new().diff(&current, &expected).expect("diff");

        assert_eq!(report.changed().count(), 2);
    }

    #[test]
    fn test_optional_absent_on_both_sides() {
        let absent = CanonicalValue::optional(None);
        let report = DiffEngine::new().diff(&absent, &absent).expect("diff");
        assert!(report.is_empty());
        assert!(!report.any_changed());
    }

    #[test]
    fn test_optional_absent_on_one_side_compares_with_zero() {
        let absent = CanonicalValue::optional(None);
        let present = CanonicalValue::optional(Some(CanonicalValue::integer(3u64)));

        let report = DiffEngine::new().diff(&absent, &present).expect("diff");
        assert_eq!(rendered(&report), [r#": "0" => "3""#]);

        let report = DiffEngine::new().diff(&present, &absent).expect("diff");
        assert_eq!(rendered(&report), [r#": "3" => "0""#]);
    }

    #[test]
    fn test_internal_fields_are_skipped() {
        let spec = |force: u64| {
            CanonicalValue::record(vec![
                Field::public("Image", text("nginx")),
                Field::internal("ForceUpdate", CanonicalValue::integer(force)),
            ])
        };
        let report = DiffEngine::new().diff(&spec(1), &spec(7)).expect("diff");

        assert!(!report.any_changed());
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_scalar_against_record_is_fatal() {
        let current = CanonicalValue::record(vec![Field::public("Mode", text("vip"))]);
        let expected = CanonicalValue::record(vec![Field::public(
            "Mode",
            CanonicalValue::record(vec![Field::public("Replicas", text("1"))]),
        )]);

        let err = DiffEngine::new().diff(&current, &expected).unwrap_err();
        assert_eq!(
            err,
            DiffError::ShapeMismatch {
                path: String::from(".Mode"),
                current: String::from("scalar(text)"),
                expected: String::from("record{Replicas}"),
            }
        );
    }

    #[test]
    fn test_scalar_kind_and_labels_must_match() {
        let engine = DiffEngine::new();
        assert!(engine.diff(&text("1"), &CanonicalValue::integer(1u32)).is_err());

        let a = CanonicalValue::record(vec![Field::public("A", text("x"))]);
        let b = CanonicalValue::record(vec![Field::public("B", text("x"))]);
        let err = engine.diff(&a, &b).unwrap_err();
        assert!(err.to_string().contains("<root>"));
    }

    #[test]
    fn test_print_spec_lists_public_leaves() {
        let spec = CanonicalValue::record(vec![
            Field::public("Image", text("nginx:1")),
            Field::public("Labels", map(&[("z", "1"), ("a", "2")])),
            Field::public("Endpoint", CanonicalValue::optional(None)),
            Field::internal("ForceUpdate", CanonicalValue::integer(0u32)),
        ]);

        let lines: Vec<String> = DiffEngine::new()
            .print_spec(&spec)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            lines,
            [r#".Image: "nginx:1""#, r#".Labels.a: "2""#, r#".Labels.z: "1""#]
        );
    }
}
