//! Role names and `{ACTION}_{ENTITY}` permission checks.
//!
//! Role names must match the seed data in `20260301000001_create_users.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_OFFICER: &str = "officer";
pub const ROLE_TELLER: &str = "teller";
pub const ROLE_AUDITOR: &str = "auditor";

pub const ALL_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_OFFICER, ROLE_TELLER, ROLE_AUDITOR];

/// Grants every permission.
pub const ALL_FUNCTIONS: &str = "ALL_FUNCTIONS";
/// Grants every `READ_*` permission.
pub const ALL_FUNCTIONS_READ: &str = "ALL_FUNCTIONS_READ";

// ---------------------------------------------------------------------------
// Entity names
// ---------------------------------------------------------------------------

pub const ENTITY_SAVINGS_ACCOUNT: &str = "SAVINGSACCOUNT";
pub const ENTITY_FIXED_DEPOSIT_ACCOUNT: &str = "FIXEDDEPOSITACCOUNT";
pub const ENTITY_RECURRING_DEPOSIT_ACCOUNT: &str = "RECURRINGDEPOSITACCOUNT";
pub const ENTITY_SAVINGS_ACCOUNT_CHARGE: &str = "SAVINGSACCOUNTCHARGE";
pub const ENTITY_SAVINGS_PRODUCT: &str = "SAVINGSPRODUCT";
pub const ENTITY_FIXED_DEPOSIT_PRODUCT: &str = "FIXEDDEPOSITPRODUCT";
pub const ENTITY_RECURRING_DEPOSIT_PRODUCT: &str = "RECURRINGDEPOSITPRODUCT";
pub const ENTITY_CHARGE: &str = "CHARGE";
pub const ENTITY_AUDIT: &str = "AUDIT";
pub const ENTITY_IMPORT: &str = "IMPORT";

/// Entities whose definitions only administrators may change.
const DEFINITION_ENTITIES: &[&str] = &[
    ENTITY_SAVINGS_PRODUCT,
    ENTITY_FIXED_DEPOSIT_PRODUCT,
    ENTITY_RECURRING_DEPOSIT_PRODUCT,
    ENTITY_CHARGE,
];

/// Money-movement actions a teller may perform.
const TELLER_ACTIONS: &[&str] = &[
    "DEPOSIT",
    "WITHDRAWAL",
    "HOLDAMOUNT",
    "RELEASEAMOUNT",
    "PAY",
];

pub fn permission_code(action: &str, entity: &str) -> String {
    format!("{action}_{entity}")
}

/// Permissions granted to a role, as listed in login responses.
pub fn role_permissions(role: &str) -> Vec<&'static str> {
    match role {
        ROLE_ADMIN => vec![ALL_FUNCTIONS],
        ROLE_OFFICER => vec![ALL_FUNCTIONS_READ, "ALL_ACCOUNT_FUNCTIONS"],
        ROLE_TELLER => vec![
            ALL_FUNCTIONS_READ,
            "DEPOSIT_*",
            "WITHDRAWAL_*",
            "HOLDAMOUNT_*",
            "RELEASEAMOUNT_*",
            "PAY_*",
        ],
        ROLE_AUDITOR => vec![ALL_FUNCTIONS_READ],
        _ => Vec::new(),
    }
}

/// `true` when `role` may perform `action` on `entity`.
pub fn has_permission(role: &str, action: &str, entity: &str) -> bool {
    let is_read = action == "READ";
    match role {
        ROLE_ADMIN => true,
        ROLE_AUDITOR => is_read,
        ROLE_TELLER => is_read || TELLER_ACTIONS.contains(&action),
        ROLE_OFFICER => is_read || !DEFINITION_ENTITIES.contains(&entity),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_do_everything() {
        assert!(has_permission(ROLE_ADMIN, "CREATE", ENTITY_SAVINGS_PRODUCT));
        assert!(has_permission(ROLE_ADMIN, "PREMATURECLOSE", ENTITY_FIXED_DEPOSIT_ACCOUNT));
    }

    #[test]
    fn auditor_is_read_only() {
        assert!(has_permission(ROLE_AUDITOR, "READ", ENTITY_SAVINGS_ACCOUNT));
        assert!(has_permission(ROLE_AUDITOR, "READ", ENTITY_AUDIT));
        assert!(!has_permission(ROLE_AUDITOR, "DEPOSIT", ENTITY_SAVINGS_ACCOUNT));
    }

    #[test]
    fn teller_moves_money_but_does_not_approve() {
        assert!(has_permission(ROLE_TELLER, "DEPOSIT", ENTITY_SAVINGS_ACCOUNT));
        assert!(has_permission(ROLE_TELLER, "WITHDRAWAL", ENTITY_RECURRING_DEPOSIT_ACCOUNT));
        assert!(has_permission(ROLE_TELLER, "PAY", ENTITY_SAVINGS_ACCOUNT_CHARGE));
        assert!(!has_permission(ROLE_TELLER, "APPROVE", ENTITY_SAVINGS_ACCOUNT));
        assert!(!has_permission(ROLE_TELLER, "UNDOTRANSACTION", ENTITY_SAVINGS_ACCOUNT));
    }

    #[test]
    fn officer_cannot_define_products_or_charges() {
        assert!(has_permission(ROLE_OFFICER, "APPROVE", ENTITY_SAVINGS_ACCOUNT));
        assert!(has_permission(ROLE_OFFICER, "READ", ENTITY_SAVINGS_PRODUCT));
        assert!(!has_permission(ROLE_OFFICER, "CREATE", ENTITY_SAVINGS_PRODUCT));
        assert!(!has_permission(ROLE_OFFICER, "UPDATE", ENTITY_CHARGE));
    }

    #[test]
    fn unknown_role_has_nothing() {
        assert!(!has_permission("guest", "READ", ENTITY_SAVINGS_ACCOUNT));
        assert!(role_permissions("guest").is_empty());
    }

    #[test]
    fn permission_code_format() {
        assert_eq!(
            permission_code("DEPOSIT", ENTITY_SAVINGS_ACCOUNT),
            "DEPOSIT_SAVINGSACCOUNT"
        );
    }
}
