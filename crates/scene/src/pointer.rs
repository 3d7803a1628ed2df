//! Pointer input normalization and pick event routing.

use foundation::math::Vec2;

use crate::picking::{FeatureId, PickingCanvas};

/// Raw pointer input as delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerInput {
    /// Canvas-relative mouse position.
    Mouse { x: f64, y: f64 },
    /// Page-space touch points plus the canvas origin in page space.
    Touch { points: Vec<Vec2>, origin: Vec2 },
}

impl PointerInput {
    /// Canvas-relative position. Multi-touch (pinch) is not a pick.
    pub fn position(&self) -> Option<Vec2> {
        let p = match self {
            PointerInput::Mouse { x, y } => Vec2::new(*x, *y),
            PointerInput::Touch { points, origin } => match points.as_slice() {
                [only] => *only - *origin,
                _ => return None,
            },
        };
        p.is_finite().then_some(p)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PointerKind {
    Move,
    Click,
    DoubleClick,
    Leave,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PickEvent {
    /// Hovered feature changed; `None` when the pointer left every feature.
    Hover(Option<FeatureId>),
    Click { feature: Option<FeatureId>, at: Vec2 },
    DoubleClick { feature: Option<FeatureId>, at: Vec2 },
}

/// Routes hover, click and double-click over one picking canvas.
///
/// The three streams are independent: a click never changes hover state and
/// hover only reports changes.
#[derive(Debug, Default)]
pub struct PickRouter {
    hovered: Option<FeatureId>,
}

impl PickRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hovered(&self) -> Option<FeatureId> {
        self.hovered
    }

    /// Forget hover state, e.g. after the picking canvas was rebuilt.
    pub fn clear(&mut self) {
        self.hovered = None;
    }

    pub fn route<P>(
        &mut self,
        canvas: &PickingCanvas<P>,
        input: &PointerInput,
        kind: PointerKind,
    ) -> Option<PickEvent> {
        if kind == PointerKind::Leave {
            return self.set_hover(None);
        }
        let at = input.position()?;
        let feature = canvas.resolve(at.x, at.y);
        match kind {
            PointerKind::Move => self.set_hover(feature),
            PointerKind::Click => Some(PickEvent::Click { feature, at }),
            PointerKind::DoubleClick => Some(PickEvent::DoubleClick { feature, at }),
            PointerKind::Leave => None,
        }
    }

    fn set_hover(&mut self, feature: Option<FeatureId>) -> Option<PickEvent> {
        if self.hovered == feature {
            return None;
        }
        self.hovered = feature;
        Some(PickEvent::Hover(feature))
    }
}
