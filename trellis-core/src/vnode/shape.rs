//! Shape classification.
//!
//! Every vnode carries a bitmask describing what kind of node it is and how
//! its children are stored, so the reconciler can dispatch without matching
//! on the payloads.

bitflags::bitflags! {
    /// Node kind and children representation, combined with bitwise OR.
    ///
    /// At most one of the `*_CHILDREN` bits is set, and it always agrees with
    /// the vnode's actual [`Children`](super::Children) variant.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShapeFlags: u16 {
        const ELEMENT = 1 << 0;
        const STATEFUL_COMPONENT = 1 << 2;
        const TEXT_CHILDREN = 1 << 3;
        const ARRAY_CHILDREN = 1 << 4;
        const SLOTS_CHILDREN = 1 << 5;

        const CHILDREN = Self::TEXT_CHILDREN.bits()
            | Self::ARRAY_CHILDREN.bits()
            | Self::SLOTS_CHILDREN.bits();
    }
}

impl ShapeFlags {
    pub fn is_element(self) -> bool {
        self.contains(Self::ELEMENT)
    }

    pub fn is_component(self) -> bool {
        self.contains(Self::STATEFUL_COMPONENT)
    }

    pub fn has_text_children(self) -> bool {
        self.contains(Self::TEXT_CHILDREN)
    }

    pub fn has_array_children(self) -> bool {
        self.contains(Self::ARRAY_CHILDREN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine() {
        let shape = ShapeFlags::ELEMENT | ShapeFlags::ARRAY_CHILDREN;
        assert!(shape.is_element());
        assert!(shape.has_array_children());
        assert!(!shape.has_text_children());
        assert!(!shape.is_component());
        assert_eq!((shape & ShapeFlags::CHILDREN).bits().count_ones(), 1);
    }
}
