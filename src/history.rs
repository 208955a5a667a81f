use crate::annotation::AnnotationOp;

/// Ordered, append-only record of committed annotations. Order is the visual
/// stacking order used by replay.
#[derive(Clone, Debug, Default)]
pub struct AnnotationLog {
    ops: Vec<AnnotationOp>,
}

impl AnnotationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, op: AnnotationOp) {
        self.ops.push(op);
    }

    pub fn can_undo(&self) -> bool {
        !self.ops.is_empty()
    }

    /// Removes and returns the most recent entry, or `None` when empty.
    pub fn undo_last(&mut self) -> Option<AnnotationOp> {
        self.ops.pop()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn list(&self) -> &[AnnotationOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::AnnotationLog;
    use crate::annotation::{AnnotationOp, Point, RectData};

    fn arrow(x: f32) -> AnnotationOp {
        AnnotationOp::Arrow {
            from: Point::new(0.0, 0.0),
            to: Point::new(x, x),
            color: [0, 0, 0, 255],
        }
    }

    #[test]
    fn append_undo_clear_flow() {
        let mut log = AnnotationLog::new();
        assert!(!log.can_undo());
        assert_eq!(log.undo_last(), None);

        log.append(arrow(1.0));
        log.append(AnnotationOp::Rectangle {
            rect: RectData::from_corners(Point::new(0.0, 0.0), Point::new(9.0, 9.0)),
            color: [255, 0, 0, 255],
        });
        log.append(arrow(3.0));
        assert_eq!(log.len(), 3);

        assert_eq!(log.undo_last(), Some(arrow(3.0)));
        assert_eq!(log.list().len(), 2);
        assert_eq!(log.list()[0], arrow(1.0));

        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.undo_last(), None);
    }
}
