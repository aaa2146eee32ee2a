//! Which roles may call which operation.
//!
//! The core trusts the identity it is given; the request layer checks
//! these rules before calling in.

use common::{Identity, Role};

use crate::error::{ReservationError, Result};

/// Operations guarded by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    BrowseCatalog,
    CreateReservation,
    ListReservations,
    UpdateReservationStatus,
    DeleteReservation,
    ManageProducts,
    DeleteProduct,
    ReadAuditTrail,
}

const ANY: &[Role] = &[Role::Client, Role::Employee, Role::Admin];
const STAFF: &[Role] = &[Role::Employee, Role::Admin];
const ADMIN: &[Role] = &[Role::Admin];

impl Operation {
    /// Roles allowed to perform the operation.
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Operation::BrowseCatalog | Operation::ListReservations => ANY,
            Operation::CreateReservation => &[Role::Client],
            Operation::UpdateReservationStatus | Operation::ManageProducts => STAFF,
            Operation::DeleteReservation | Operation::DeleteProduct | Operation::ReadAuditTrail => {
                ADMIN
            }
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Operation::BrowseCatalog => "browse the catalog",
            Operation::CreateReservation => "create reservations",
            Operation::ListReservations => "list reservations",
            Operation::UpdateReservationStatus => "update reservation status",
            Operation::DeleteReservation => "delete reservations",
            Operation::ManageProducts => "manage products",
            Operation::DeleteProduct => "delete products",
            Operation::ReadAuditTrail => "read the audit trail",
        }
    }
}

/// Fails with `Forbidden` unless the caller's role may perform `operation`.
pub fn authorize(identity: &Identity, operation: Operation) -> Result<()> {
    if operation.allowed_roles().contains(&identity.role) {
        return Ok(());
    }
    tracing::warn!(
        user_id = %identity.id,
        role = %identity.role,
        ?operation,
        "operation refused"
    );
    Err(ReservationError::Forbidden {
        role: identity.role,
        operation: operation.describe(),
    })
}

#[cfg(test)]
mod tests {
    use common::UserId;

    use super::*;

    fn caller(role: Role) -> Identity {
        Identity::new(UserId::new(1), "someone@example.com", role)
    }

    #[test]
    fn only_clients_create_reservations() {
        assert!(authorize(&caller(Role::Client), Operation::CreateReservation).is_ok());
        assert!(authorize(&caller(Role::Employee), Operation::CreateReservation).is_err());
        assert!(authorize(&caller(Role::Admin), Operation::CreateReservation).is_err());
    }

    #[test]
    fn staff_update_status_and_manage_products() {
        for op in [Operation::UpdateReservationStatus, Operation::ManageProducts] {
            assert!(authorize(&caller(Role::Employee), op).is_ok());
            assert!(authorize(&caller(Role::Admin), op).is_ok());
            assert!(authorize(&caller(Role::Client), op).is_err());
        }
    }

    #[test]
    fn admin_only_operations() {
        for op in [
            Operation::DeleteReservation,
            Operation::DeleteProduct,
            Operation::ReadAuditTrail,
        ] {
            assert!(authorize(&caller(Role::Admin), op).is_ok());
            let err = authorize(&caller(Role::Employee), op).unwrap_err();
            assert_eq!(err.status_code(), 403);
        }
    }

    #[test]
    fn everyone_lists_and_browses() {
        for role in [Role::Client, Role::Employee, Role::Admin] {
            assert!(authorize(&caller(role), Operation::ListReservations).is_ok());
            assert!(authorize(&caller(role), Operation::BrowseCatalog).is_ok());
        }
    }
}
