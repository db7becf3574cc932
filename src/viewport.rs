use std::cell::RefCell;
use std::rc::Rc;

use crate::geometry::CPos;

/// What scripts can see of the renderer: where the camera looks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub center: CPos,
}

#[derive(Clone, Default)]
pub struct ViewportHandle(Rc<RefCell<Viewport>>);

impl ViewportHandle {
    pub fn new(center: CPos) -> Self {
        Self(Rc::new(RefCell::new(Viewport { center })))
    }

    pub fn center(&self) -> CPos {
        self.0.borrow().center
    }

    pub fn set_center(&self, center: CPos) {
        self.0.borrow_mut().center = center;
    }
}
