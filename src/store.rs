//! Live Stroke Store: in-progress strokes keyed by stroke id.
//!
//! Local pen input and remote `draw` updates both land here. Points are merged
//! by their author-assigned `seq`, never by arrival order, so the preview is
//! correct even when the network reorders or repeats updates. Entries leave the
//! store when the server commits them or when their author disconnects.
//!
//! Committed ids are remembered for the life of the store. A `draw` that
//! arrives after its stroke was committed is refused instead of reopening a
//! preview that nothing would ever evict.
//!
//! The render scheduler reads the store through [`LiveStrokeStore::snapshot_for_render`]
//! and never mutates it.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::{HashMap, HashSet};

use crate::model::{LiveStroke, SeqPoint, StrokeId, StrokeMeta};

/// Render-ready view of one live stroke.
#[derive(Debug, Clone, Copy)]
pub struct PreviewStroke<'a> {
    pub stroke_id: &'a StrokeId,
    pub meta: &'a StrokeMeta,
    /// Points in ascending `seq` order, ties in arrival order.
    pub points: &'a [SeqPoint],
}

/// In-memory store of in-progress strokes.
#[derive(Debug, Default)]
pub struct LiveStrokeStore {
    strokes: HashMap<StrokeId, LiveStroke>,
    committed: HashSet<StrokeId>,
    next_opened: u64,
}

impl LiveStrokeStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the local participant's stroke, seeded with its first point.
    ///
    /// Returns `false` and changes nothing if the id is already present.
    pub fn start_local_stroke(&mut self, stroke_id: StrokeId, meta: StrokeMeta, origin: SeqPoint) -> bool {
        if self.strokes.contains_key(&stroke_id) {
            tracing::debug!(%stroke_id, "local stroke already open");
            return false;
        }
        let stroke = self.open(stroke_id, meta);
        stroke.insert(origin);
        true
    }

    /// Append a point to a stroke the local participant opened.
    ///
    /// Returns `false` for an unknown stroke.
    pub fn append_local_point(&mut self, stroke_id: &StrokeId, point: SeqPoint) -> bool {
        let Some(stroke) = self.strokes.get_mut(stroke_id) else {
            return false;
        };
        stroke.insert(point);
        true
    }

    /// Merge a remote point update.
    ///
    /// The first update seen for a stroke fixes its metadata; later `meta`
    /// values are ignored. Out-of-order and repeated `seq` values are accepted.
    /// Returns `false` and changes nothing if the stroke was already committed.
    pub fn merge_remote_point(&mut self, stroke_id: StrokeId, point: SeqPoint, meta: StrokeMeta) -> bool {
        if self.committed.contains(&stroke_id) {
            tracing::trace!(%stroke_id, seq = point.seq, "late point for committed stroke");
            return false;
        }
        match self.strokes.get_mut(&stroke_id) {
            Some(stroke) => stroke.insert(point),
            None => self.open(stroke_id, meta).insert(point),
        }
        true
    }

    /// Remove one stroke, returning it if it was present.
    pub fn evict(&mut self, stroke_id: &StrokeId) -> Option<LiveStroke> {
        self.strokes.remove(stroke_id)
    }

    /// Remove every stroke authored by `user_id`. Returns how many were removed.
    pub fn evict_by_author(&mut self, user_id: &str) -> usize {
        let doomed: Vec<StrokeId> = self
            .strokes
            .values()
            .filter(|s| s.meta.author == user_id)
            .map(|s| s.stroke_id.clone())
            .collect();
        for id in &doomed {
            self.strokes.remove(id);
        }
        doomed.len()
    }

    /// Remove every stroke whose id is in `committed` and refuse later points
    /// for those ids. Returns how many were removed.
    pub fn evict_committed(&mut self, committed: &HashSet<&StrokeId>) -> usize {
        self.committed.extend(committed.iter().map(|id| (*id).clone()));
        let doomed: Vec<StrokeId> = self
            .strokes
            .keys()
            .filter(|id| committed.contains(id))
            .cloned()
            .collect();
        for id in &doomed {
            self.strokes.remove(id);
        }
        doomed.len()
    }

    /// All live strokes in the order they were first seen, points sorted by `seq`.
    #[must_use]
    pub fn snapshot_for_render(&self) -> Vec<PreviewStroke<'_>> {
        let mut strokes: Vec<&LiveStroke> = self.strokes.values().collect();
        strokes.sort_by_key(|s| s.opened);
        strokes
            .into_iter()
            .map(|s| PreviewStroke { stroke_id: &s.stroke_id, meta: &s.meta, points: s.points() })
            .collect()
    }

    #[must_use]
    pub fn get(&self, stroke_id: &StrokeId) -> Option<&LiveStroke> {
        self.strokes.get(stroke_id)
    }

    #[must_use]
    pub fn contains(&self, stroke_id: &StrokeId) -> bool {
        self.strokes.contains_key(stroke_id)
    }

    /// Whether `stroke_id` has been committed and is closed to further points.
    #[must_use]
    pub fn is_committed(&self, stroke_id: &StrokeId) -> bool {
        self.committed.contains(stroke_id)
    }

    /// Number of live strokes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    fn open(&mut self, stroke_id: StrokeId, meta: StrokeMeta) -> &mut LiveStroke {
        let opened = self.next_opened;
        self.next_opened += 1;
        self.strokes
            .entry(stroke_id.clone())
            .or_insert_with(|| LiveStroke::new(stroke_id, meta, opened))
    }
}
