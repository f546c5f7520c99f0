//! Span clustering: building the fragmap.
//!
//! Each hunk of each commit becomes a [`FileSpan`]; spans on the same path
//! that overlap or sit adjacent are merged into [`SpanCluster`]s across all
//! commits. The resulting [`FragMap`] is a commit x cluster matrix showing
//! which commits touch shared regions of code, plus a pairwise relationship
//! classification.
//!
//! The relationship classification is a *prediction* based on diff text.
//! Whether two commits actually conflict is only known once a cherry-pick is
//! executed; callers should present it as advisory.

use std::collections::BTreeMap;

use restitch_git::{Commit, CommitDiff, DiffLineKind, FileDiff};
use serde::Serialize;

use crate::error::{Error, Result};

/// A file-path plus line-range unit derived from one hunk.
///
/// Coordinates are post-image for additions and modifications, pre-image for
/// pure deletions (which have no post-image lines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSpan {
    /// Path the span belongs to.
    pub path: String,
    /// First line of the range (1-based, inclusive).
    pub start_line: u32,
    /// Last line of the range (inclusive).
    pub end_line: u32,
}

impl FileSpan {
    /// Create a span, rejecting malformed ranges up front.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSpan`] if `end_line < start_line`.
    pub fn new(path: impl Into<String>, start_line: u32, end_line: u32) -> Result<Self> {
        let path = path.into();
        if end_line < start_line {
            return Err(Error::InvalidSpan {
                path,
                start: start_line,
                end: end_line,
            });
        }
        Ok(Self {
            path,
            start_line,
            end_line,
        })
    }
}

/// How a commit touches a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TouchKind {
    /// The commit adds the file the cluster belongs to.
    Added,
    /// The commit modifies lines in the cluster's range.
    Modified,
    /// The commit deletes the file entirely.
    Deleted,
    /// The commit does not touch this cluster.
    None,
}

/// Predicted relationship between two commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelationshipKind {
    /// The commits share clusters but their edits do not collide; folding
    /// one into the other is expected to apply cleanly.
    Squashable,
    /// The commits alter an overlapping line with divergent content.
    Conflicting,
    /// The commits share no cluster.
    Unrelated,
}

/// A maximal set of overlapping-or-adjacent spans on one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanCluster {
    /// Path all member spans share.
    pub path: String,
    /// Start of the merged range.
    pub start_line: u32,
    /// End of the merged range.
    pub end_line: u32,
    /// Member spans, tagged with the contributing commit's row index.
    pub spans: Vec<(usize, FileSpan)>,
}

/// Commit x cluster matrix with per-cell touch classification.
///
/// Rows are commits in input order; columns are clusters ordered by path
/// (lexicographic) then start position. `touch[row][col]` is non-`None` iff
/// the commit contributed at least one span to the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragMap {
    /// Commits, in the order their diffs were supplied.
    pub commits: Vec<Commit>,
    /// Clusters, in column order.
    pub clusters: Vec<SpanCluster>,
    /// Touch matrix, `commits.len()` rows by `clusters.len()` columns.
    pub touch: Vec<Vec<TouchKind>>,
    /// Pairwise predicted relationships, `commits.len()` square.
    pub relationships: Vec<Vec<RelationshipKind>>,
}

impl FragMap {
    /// Predicted relationship between two commit rows.
    #[must_use]
    pub fn relationship(&self, a: usize, b: usize) -> RelationshipKind {
        self.relationships[a][b]
    }

    /// Whether two commits share at least one cluster.
    #[must_use]
    pub fn relates(&self, a: usize, b: usize) -> bool {
        self.relationships[a][b] != RelationshipKind::Unrelated
    }

    /// The single earlier commit that `idx` could be squashed into, if the
    /// choice is unambiguous: exactly one earlier related commit, with a
    /// squashable prediction.
    #[must_use]
    pub fn squash_target(&self, idx: usize) -> Option<usize> {
        let mut earlier = (0..idx).filter(|&i| self.relates(i, idx));
        let candidate = earlier.next()?;
        if earlier.next().is_some() {
            return None;
        }
        (self.relationships[candidate][idx] == RelationshipKind::Squashable).then_some(candidate)
    }

    /// Whether every commit related to `idx` is predicted squashable.
    #[must_use]
    pub fn is_fully_squashable(&self, idx: usize) -> bool {
        self.relationships[idx]
            .iter()
            .all(|&r| r != RelationshipKind::Conflicting)
    }
}

/// Per-file touch as seen from the diff's path presence.
fn file_touch(file: &FileDiff) -> TouchKind {
    if file.old_path.is_none() {
        TouchKind::Added
    } else if file.new_path.is_none() {
        TouchKind::Deleted
    } else {
        TouchKind::Modified
    }
}

/// Resulting content per changed line of one commit, keyed by path and line
/// index: added lines carry their text (post-image index), removed lines map
/// to `None` (pre-image index). A replaced line keeps the new text.
type ChangedLines = BTreeMap<(String, u32), Option<String>>;

fn changed_lines(diff: &CommitDiff) -> ChangedLines {
    let mut map = ChangedLines::new();
    for file in &diff.files {
        let Some(path) = file.path() else { continue };
        for hunk in &file.hunks {
            let mut old_line = hunk.old_start;
            let mut new_line = hunk.new_start;
            for line in &hunk.lines {
                match line.kind {
                    DiffLineKind::Deletion => {
                        map.entry((path.to_string(), old_line)).or_insert(None);
                        old_line += 1;
                    }
                    DiffLineKind::Addition => {
                        map.insert((path.to_string(), new_line), Some(line.content.clone()));
                        new_line += 1;
                    }
                    DiffLineKind::Context => {
                        old_line += 1;
                        new_line += 1;
                    }
                }
            }
        }
    }
    map
}

struct SpanRecord {
    commit: usize,
    span: FileSpan,
}

/// Build the fragmap for an ordered sequence of commit diffs.
///
/// Pure and total over well-formed diffs; deterministic for equal input.
///
/// # Errors
/// Returns [`Error::InvalidSpan`] if a diff carries a hunk whose range is
/// malformed.
pub fn cluster(diffs: &[CommitDiff]) -> Result<FragMap> {
    // One span per (commit, hunk), grouped by path.
    let mut by_path: BTreeMap<String, Vec<SpanRecord>> = BTreeMap::new();
    for (commit_idx, diff) in diffs.iter().enumerate() {
        for file in &diff.files {
            let Some(path) = file.path() else { continue };
            for hunk in &file.hunks {
                let (start, len) = if hunk.new_lines == 0 {
                    // Pure deletion: no post-image lines to anchor on.
                    (hunk.old_start, hunk.old_lines)
                } else {
                    (hunk.new_start, hunk.new_lines)
                };
                if len == 0 {
                    continue;
                }
                let span = FileSpan::new(path, start, start + len - 1)?;
                by_path.entry(path.to_string()).or_default().push(SpanRecord {
                    commit: commit_idx,
                    span,
                });
            }
        }
    }

    // Sweep each path's spans into maximal clusters. BTreeMap iteration
    // gives lexicographic path order; the stable sort keeps commit order
    // for equal start lines, so column order is deterministic.
    let mut clusters: Vec<SpanCluster> = Vec::new();
    let mut touch: Vec<Vec<TouchKind>> = vec![Vec::new(); diffs.len()];
    for (path, mut records) in by_path {
        records.sort_by_key(|r| r.span.start_line);

        let mut current: Option<SpanCluster> = None;
        for record in records {
            let joins = current
                .as_ref()
                .is_some_and(|c| record.span.start_line <= c.end_line + 1);
            if joins {
                if let Some(c) = current.as_mut() {
                    c.end_line = c.end_line.max(record.span.end_line);
                    c.spans.push((record.commit, record.span));
                }
            } else {
                if let Some(done) = current.take() {
                    push_cluster(&mut clusters, &mut touch, done, diffs.len());
                }
                current = Some(SpanCluster {
                    path: path.clone(),
                    start_line: record.span.start_line,
                    end_line: record.span.end_line,
                    spans: vec![(record.commit, record.span)],
                });
            }
        }
        if let Some(done) = current.take() {
            push_cluster(&mut clusters, &mut touch, done, diffs.len());
        }
    }

    // Fill the matrix cells from the per-file touch kinds.
    for (col, cluster) in clusters.iter().enumerate() {
        for &(commit_idx, _) in &cluster.spans {
            let kind = diffs[commit_idx]
                .files
                .iter()
                .find(|f| f.path() == Some(cluster.path.as_str()))
                .map_or(TouchKind::Modified, file_touch);
            touch[commit_idx][col] = kind;
        }
    }

    let relationships = classify(diffs, &clusters, &touch);

    Ok(FragMap {
        commits: diffs.iter().map(|d| d.commit.clone()).collect(),
        clusters,
        touch,
        relationships,
    })
}

fn push_cluster(
    clusters: &mut Vec<SpanCluster>,
    touch: &mut [Vec<TouchKind>],
    cluster: SpanCluster,
    commit_count: usize,
) {
    for row in touch.iter_mut().take(commit_count) {
        row.push(TouchKind::None);
    }
    clusters.push(cluster);
}

fn classify(
    diffs: &[CommitDiff],
    clusters: &[SpanCluster],
    touch: &[Vec<TouchKind>],
) -> Vec<Vec<RelationshipKind>> {
    let changed: Vec<ChangedLines> = diffs.iter().map(changed_lines).collect();
    let n = diffs.len();
    let mut rel = vec![vec![RelationshipKind::Unrelated; n]; n];

    for a in 0..n {
        for b in (a + 1)..n {
            let shared: Vec<&SpanCluster> = clusters
                .iter()
                .enumerate()
                .filter(|&(col, _)| {
                    touch[a][col] != TouchKind::None && touch[b][col] != TouchKind::None
                })
                .map(|(_, c)| c)
                .collect();
            if shared.is_empty() {
                continue;
            }

            let kind = if shared
                .iter()
                .any(|c| collides(&changed[a], &changed[b], c))
            {
                RelationshipKind::Conflicting
            } else {
                RelationshipKind::Squashable
            };
            rel[a][b] = kind;
            rel[b][a] = kind;
        }
    }
    rel
}

/// Two commits collide in a cluster when some line index inside its range
/// resolves to different content on each side.
fn collides(a: &ChangedLines, b: &ChangedLines, cluster: &SpanCluster) -> bool {
    let from = (cluster.path.clone(), cluster.start_line);
    let to = (cluster.path.clone(), cluster.end_line);
    a.range(from..=to)
        .any(|(key, value_a)| b.get(key).is_some_and(|value_b| value_b != value_a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use restitch_git::{DiffLine, Hunk};

    fn commit(oid: &str) -> Commit {
        Commit {
            oid: oid.to_string(),
            summary: format!("Commit {oid}"),
            message: format!("Commit {oid}"),
            author: "Test".into(),
            author_email: "test@example.com".into(),
            author_date: chrono::DateTime::UNIX_EPOCH,
            committer: "Test".into(),
            committer_email: "test@example.com".into(),
            commit_date: chrono::DateTime::UNIX_EPOCH,
            parent_oids: vec![],
        }
    }

    fn line(kind: DiffLineKind, content: &str) -> DiffLine {
        DiffLine {
            kind,
            content: content.to_string(),
        }
    }

    fn add_hunk(new_start: u32, texts: &[&str]) -> Hunk {
        Hunk {
            old_start: new_start.saturating_sub(1),
            old_lines: 0,
            new_start,
            new_lines: texts.len() as u32,
            lines: texts
                .iter()
                .map(|t| line(DiffLineKind::Addition, t))
                .collect(),
        }
    }

    fn replace_hunk(start: u32, old: &[&str], new: &[&str]) -> Hunk {
        let mut lines: Vec<DiffLine> = old
            .iter()
            .map(|t| line(DiffLineKind::Deletion, t))
            .collect();
        lines.extend(new.iter().map(|t| line(DiffLineKind::Addition, t)));
        Hunk {
            old_start: start,
            old_lines: old.len() as u32,
            new_start: start,
            new_lines: new.len() as u32,
            lines,
        }
    }

    fn added_file(path: &str, hunks: Vec<Hunk>) -> FileDiff {
        FileDiff {
            old_path: None,
            new_path: Some(path.to_string()),
            hunks,
        }
    }

    fn modified_file(path: &str, hunks: Vec<Hunk>) -> FileDiff {
        FileDiff {
            old_path: Some(path.to_string()),
            new_path: Some(path.to_string()),
            hunks,
        }
    }

    fn diff(oid: &str, files: Vec<FileDiff>) -> CommitDiff {
        CommitDiff {
            commit: commit(oid),
            files,
        }
    }

    #[test]
    fn invalid_span_rejected() {
        let err = FileSpan::new("f.txt", 5, 3).unwrap_err();
        assert!(matches!(err, Error::InvalidSpan { start: 5, end: 3, .. }));
    }

    #[test]
    fn adjacent_spans_merge() {
        let diffs = vec![
            diff("c1", vec![modified_file("f.txt", vec![replace_hunk(1, &["a"], &["A"])])]),
            diff("c2", vec![modified_file("f.txt", vec![replace_hunk(2, &["b"], &["B"])])]),
        ];
        let map = cluster(&diffs).unwrap();
        assert_eq!(map.clusters.len(), 1);
        assert_eq!(map.clusters[0].start_line, 1);
        assert_eq!(map.clusters[0].end_line, 2);
        assert!(map.relates(0, 1));
    }

    #[test]
    fn gapped_spans_stay_separate() {
        let diffs = vec![
            diff("c1", vec![modified_file("f.txt", vec![replace_hunk(1, &["a"], &["A"])])]),
            diff("c2", vec![modified_file("f.txt", vec![replace_hunk(10, &["b"], &["B"])])]),
        ];
        let map = cluster(&diffs).unwrap();
        assert_eq!(map.clusters.len(), 2);
        assert!(!map.relates(0, 1));
        assert_eq!(map.relationship(0, 1), RelationshipKind::Unrelated);
    }

    #[test]
    fn maximality_holds() {
        let diffs = vec![
            diff(
                "c1",
                vec![modified_file(
                    "f.txt",
                    vec![replace_hunk(1, &["a"], &["A"]), replace_hunk(8, &["b"], &["B"])],
                )],
            ),
            diff("c2", vec![modified_file("f.txt", vec![replace_hunk(2, &["c"], &["C"])])]),
        ];
        let map = cluster(&diffs).unwrap();
        for pair in map.clusters.windows(2) {
            if pair[0].path == pair[1].path {
                assert!(pair[1].start_line > pair[0].end_line + 1);
            }
        }
    }

    #[test]
    fn determinism() {
        let diffs = vec![
            diff(
                "c1",
                vec![
                    added_file("b.txt", vec![add_hunk(1, &["x"])]),
                    modified_file("a.txt", vec![replace_hunk(3, &["y"], &["Y"])]),
                ],
            ),
            diff("c2", vec![modified_file("a.txt", vec![replace_hunk(4, &["z"], &["Z"])])]),
        ];
        assert_eq!(cluster(&diffs).unwrap(), cluster(&diffs).unwrap());
    }

    #[test]
    fn columns_ordered_by_path_then_start() {
        let diffs = vec![diff(
            "c1",
            vec![
                modified_file("b.txt", vec![replace_hunk(1, &["x"], &["X"])]),
                modified_file(
                    "a.txt",
                    vec![replace_hunk(10, &["y"], &["Y"]), replace_hunk(1, &["z"], &["Z"])],
                ),
            ],
        )];
        let map = cluster(&diffs).unwrap();
        let order: Vec<(&str, u32)> = map
            .clusters
            .iter()
            .map(|c| (c.path.as_str(), c.start_line))
            .collect();
        assert_eq!(order, vec![("a.txt", 1), ("a.txt", 10), ("b.txt", 1)]);
    }

    #[test]
    fn added_then_modified_shares_cluster() {
        // C1 adds a.txt lines 1-5; C2 rewrites lines 3-4 with new content.
        let diffs = vec![
            diff(
                "c1",
                vec![added_file(
                    "a.txt",
                    vec![add_hunk(1, &["one", "two", "three", "four", "five"])],
                )],
            ),
            diff(
                "c2",
                vec![modified_file(
                    "a.txt",
                    vec![replace_hunk(3, &["three", "four"], &["THREE", "FOUR"])],
                )],
            ),
        ];
        let map = cluster(&diffs).unwrap();

        assert_eq!(map.clusters.len(), 1);
        assert_eq!(map.clusters[0].start_line, 1);
        assert_eq!(map.clusters[0].end_line, 5);
        assert_eq!(map.touch[0][0], TouchKind::Added);
        assert_eq!(map.touch[1][0], TouchKind::Modified);
        // Both commits resolve lines 3-4 to different text.
        assert_eq!(map.relationship(0, 1), RelationshipKind::Conflicting);
    }

    #[test]
    fn disjoint_edits_in_shared_cluster_are_squashable() {
        let diffs = vec![
            diff("c1", vec![modified_file("a.txt", vec![replace_hunk(1, &["a", "b"], &["A", "B"])])]),
            diff("c2", vec![modified_file("a.txt", vec![replace_hunk(3, &["c", "d"], &["C", "D"])])]),
        ];
        let map = cluster(&diffs).unwrap();
        assert_eq!(map.clusters.len(), 1);
        assert_eq!(map.relationship(0, 1), RelationshipKind::Squashable);
    }

    #[test]
    fn identical_edits_are_squashable() {
        let diffs = vec![
            diff("c1", vec![modified_file("a.txt", vec![replace_hunk(2, &["x"], &["X"])])]),
            diff("c2", vec![modified_file("a.txt", vec![replace_hunk(2, &["x"], &["X"])])]),
        ];
        let map = cluster(&diffs).unwrap();
        assert_eq!(map.relationship(0, 1), RelationshipKind::Squashable);
    }

    #[test]
    fn relationship_is_symmetric() {
        let diffs = vec![
            diff("c1", vec![modified_file("a.txt", vec![replace_hunk(1, &["a"], &["A"])])]),
            diff("c2", vec![modified_file("a.txt", vec![replace_hunk(1, &["a"], &["B"])])]),
            diff("c3", vec![modified_file("z.txt", vec![replace_hunk(1, &["z"], &["Z"])])]),
        ];
        let map = cluster(&diffs).unwrap();
        for a in 0..3 {
            for b in 0..3 {
                if a != b {
                    assert_eq!(map.relationship(a, b), map.relationship(b, a));
                }
            }
        }
        assert_eq!(map.relationship(0, 1), RelationshipKind::Conflicting);
    }

    #[test]
    fn pure_deletion_uses_pre_image_coordinates() {
        let delete_hunk = Hunk {
            old_start: 4,
            old_lines: 2,
            new_start: 3,
            new_lines: 0,
            lines: vec![line(DiffLineKind::Deletion, "d"), line(DiffLineKind::Deletion, "e")],
        };
        let diffs = vec![diff("c1", vec![modified_file("f.txt", vec![delete_hunk])])];
        let map = cluster(&diffs).unwrap();
        assert_eq!(map.clusters[0].start_line, 4);
        assert_eq!(map.clusters[0].end_line, 5);
    }

    #[test]
    fn squash_target_picks_unambiguous_earlier_commit() {
        let diffs = vec![
            diff("c1", vec![modified_file("a.txt", vec![replace_hunk(1, &["a"], &["A"])])]),
            diff("c2", vec![modified_file("b.txt", vec![replace_hunk(1, &["b"], &["B"])])]),
            diff("c3", vec![modified_file("a.txt", vec![replace_hunk(2, &["c"], &["C"])])]),
        ];
        let map = cluster(&diffs).unwrap();
        assert_eq!(map.squash_target(2), Some(0));
        assert_eq!(map.squash_target(1), None);
        assert!(map.is_fully_squashable(2));
    }
}
