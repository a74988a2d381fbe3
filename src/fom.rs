//! Interface to the federation object model.
//!
//! The FOM (class and attribute definitions, handle validity) lives outside
//! this crate. The directory only ever asks it three questions: is this
//! class defined, is this attribute defined on this class, and which
//! attribute handle carries the privilege to delete an instance. The
//! delete privilege is an ordinary attribute as far as ownership is
//! concerned; it flows through the same records as everything else.

use crate::error::{FederateError, FederateResult};
use crate::handle::{AttributeHandle, ObjectClassHandle};

/// Read-only view of the federation object model.
pub trait FomView: Send + Sync {
    fn object_class_defined(&self, class: ObjectClassHandle) -> bool;

    fn attribute_defined(&self, class: ObjectClassHandle, attribute: AttributeHandle) -> bool;

    /// The pseudo-attribute whose owner may delete an instance.
    fn delete_privilege(&self) -> AttributeHandle;
}

/// Fails `ObjectClassNotDefined` unless the FOM knows the class.
pub fn check_class_defined(fom: &dyn FomView, class: ObjectClassHandle) -> FederateResult<()> {
    if fom.object_class_defined(class) {
        Ok(())
    } else {
        Err(FederateError::ObjectClassNotDefined(class))
    }
}

/// Fails `AttributeNotDefined` unless the FOM defines the attribute on the
/// class.
pub fn check_attribute_defined(
    fom: &dyn FomView,
    class: ObjectClassHandle,
    attribute: AttributeHandle,
) -> FederateResult<()> {
    if fom.attribute_defined(class, attribute) {
        Ok(())
    } else {
        Err(FederateError::AttributeNotDefined { class, attribute })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestFom;

    #[test]
    fn checks_delegate_to_the_fom() {
        let fom = TestFom::with_class(ObjectClassHandle(1), &[AttributeHandle(10)]);
        assert!(check_class_defined(&fom, ObjectClassHandle(1)).is_ok());
        assert_eq!(
            check_class_defined(&fom, ObjectClassHandle(2)),
            Err(FederateError::ObjectClassNotDefined(ObjectClassHandle(2)))
        );
        assert!(check_attribute_defined(&fom, ObjectClassHandle(1), AttributeHandle(10)).is_ok());
        // the delete privilege is defined on every class
        assert!(
            check_attribute_defined(&fom, ObjectClassHandle(1), fom.delete_privilege()).is_ok()
        );
        assert!(matches!(
            check_attribute_defined(&fom, ObjectClassHandle(1), AttributeHandle(99)),
            Err(FederateError::AttributeNotDefined { .. })
        ));
    }
}
