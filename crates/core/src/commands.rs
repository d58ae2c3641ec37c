//! `?command=` discriminators accepted by the account, transaction and
//! charge endpoints.
//!
//! Values match case-insensitively after trimming. A blank or unknown value
//! fails with [`CoreError::UnrecognizedQueryParam`] listing every value the
//! endpoint accepts.

use crate::error::CoreError;

/// A command that has a canonical wire name.
pub trait CommandName: Copy + 'static {
    fn name(self) -> &'static str;
}

/// Parse `raw` against `allowed`, case-insensitively.
pub fn parse_command<C: CommandName>(
    param: &str,
    raw: Option<&str>,
    allowed: &[C],
) -> Result<C, CoreError> {
    let value = raw.map(str::trim).unwrap_or_default();
    allowed
        .iter()
        .copied()
        .find(|c| !value.is_empty() && c.name().eq_ignore_ascii_case(value))
        .ok_or_else(|| CoreError::UnrecognizedQueryParam {
            param: param.to_string(),
            value: value.to_string(),
            allowed: allowed.iter().map(|c| c.name().to_string()).collect(),
        })
}

/// `true` when `raw` names `expected` (case-insensitive, trimmed).
pub fn is_command(raw: Option<&str>, expected: &str) -> bool {
    raw.map(str::trim)
        .is_some_and(|v| v.eq_ignore_ascii_case(expected))
}

// ---------------------------------------------------------------------------
// Account lifecycle commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountCommand {
    Reject,
    WithdrawnByApplicant,
    Approve,
    UndoApproval,
    Activate,
    CalculateInterest,
    PostInterest,
    ApplyAnnualFees,
    Close,
    AssignSavingsOfficer,
    UnassignSavingsOfficer,
    BlockDebit,
    UnblockDebit,
    BlockCredit,
    UnblockCredit,
    Block,
    Unblock,
    PrematureClose,
    CalculatePrematureAmount,
    UpdateDepositAmount,
}

impl CommandName for AccountCommand {
    fn name(self) -> &'static str {
        match self {
            AccountCommand::Reject => "reject",
            AccountCommand::WithdrawnByApplicant => "withdrawnByApplicant",
            AccountCommand::Approve => "approve",
            AccountCommand::UndoApproval => "undoapproval",
            AccountCommand::Activate => "activate",
            AccountCommand::CalculateInterest => "calculateInterest",
            AccountCommand::PostInterest => "postInterest",
            AccountCommand::ApplyAnnualFees => "applyAnnualFees",
            AccountCommand::Close => "close",
            AccountCommand::AssignSavingsOfficer => "assignSavingsOfficer",
            AccountCommand::UnassignSavingsOfficer => "unassignSavingsOfficer",
            AccountCommand::BlockDebit => "blockDebit",
            AccountCommand::UnblockDebit => "unblockDebit",
            AccountCommand::BlockCredit => "blockCredit",
            AccountCommand::UnblockCredit => "unblockCredit",
            AccountCommand::Block => "block",
            AccountCommand::Unblock => "unblock",
            AccountCommand::PrematureClose => "prematureClose",
            AccountCommand::CalculatePrematureAmount => "calculatePrematureAmount",
            AccountCommand::UpdateDepositAmount => "updateDepositAmount",
        }
    }
}

impl AccountCommand {
    /// Permission action code (`{ACTION}_{ENTITY}`).
    pub fn action(self) -> &'static str {
        match self {
            AccountCommand::Reject => "REJECT",
            AccountCommand::WithdrawnByApplicant => "WITHDRAW",
            AccountCommand::Approve => "APPROVE",
            AccountCommand::UndoApproval => "APPROVALUNDO",
            AccountCommand::Activate => "ACTIVATE",
            AccountCommand::CalculateInterest => "CALCULATEINTEREST",
            AccountCommand::PostInterest => "POSTINTEREST",
            AccountCommand::ApplyAnnualFees => "APPLYANNUALFEES",
            AccountCommand::Close => "CLOSE",
            AccountCommand::AssignSavingsOfficer => "UPDATESAVINGSOFFICER",
            AccountCommand::UnassignSavingsOfficer => "REMOVESAVINGSOFFICER",
            AccountCommand::BlockDebit => "BLOCKDEBIT",
            AccountCommand::UnblockDebit => "UNBLOCKDEBIT",
            AccountCommand::BlockCredit => "BLOCKCREDIT",
            AccountCommand::UnblockCredit => "UNBLOCKCREDIT",
            AccountCommand::Block => "BLOCK",
            AccountCommand::Unblock => "UNBLOCK",
            AccountCommand::PrematureClose => "PREMATURECLOSE",
            AccountCommand::CalculatePrematureAmount => "CALCULATEPREMATUREAMOUNT",
            AccountCommand::UpdateDepositAmount => "UPDATEDEPOSITAMOUNT",
        }
    }
}

pub const SAVINGS_ACCOUNT_COMMANDS: &[AccountCommand] = &[
    AccountCommand::Reject,
    AccountCommand::WithdrawnByApplicant,
    AccountCommand::Approve,
    AccountCommand::UndoApproval,
    AccountCommand::Activate,
    AccountCommand::CalculateInterest,
    AccountCommand::PostInterest,
    AccountCommand::ApplyAnnualFees,
    AccountCommand::Close,
    AccountCommand::AssignSavingsOfficer,
    AccountCommand::UnassignSavingsOfficer,
    AccountCommand::BlockDebit,
    AccountCommand::UnblockDebit,
    AccountCommand::BlockCredit,
    AccountCommand::UnblockCredit,
    AccountCommand::Block,
    AccountCommand::Unblock,
];

pub const FIXED_DEPOSIT_ACCOUNT_COMMANDS: &[AccountCommand] = &[
    AccountCommand::Reject,
    AccountCommand::WithdrawnByApplicant,
    AccountCommand::Approve,
    AccountCommand::UndoApproval,
    AccountCommand::Activate,
    AccountCommand::CalculateInterest,
    AccountCommand::PostInterest,
    AccountCommand::Close,
    AccountCommand::PrematureClose,
    AccountCommand::CalculatePrematureAmount,
];

pub const RECURRING_DEPOSIT_ACCOUNT_COMMANDS: &[AccountCommand] = &[
    AccountCommand::Reject,
    AccountCommand::WithdrawnByApplicant,
    AccountCommand::Approve,
    AccountCommand::UndoApproval,
    AccountCommand::Activate,
    AccountCommand::UpdateDepositAmount,
    AccountCommand::CalculateInterest,
    AccountCommand::PostInterest,
    AccountCommand::Close,
    AccountCommand::PrematureClose,
    AccountCommand::CalculatePrematureAmount,
];

// ---------------------------------------------------------------------------
// Transaction commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionCommand {
    Deposit,
    Withdrawal,
    PostInterestAsOn,
    HoldAmount,
    Undo,
    Modify,
    ReleaseAmount,
}

impl CommandName for TransactionCommand {
    fn name(self) -> &'static str {
        match self {
            TransactionCommand::Deposit => "deposit",
            TransactionCommand::Withdrawal => "withdrawal",
            TransactionCommand::PostInterestAsOn => "postInterestAsOn",
            TransactionCommand::HoldAmount => "holdAmount",
            TransactionCommand::Undo => "undo",
            TransactionCommand::Modify => "modify",
            TransactionCommand::ReleaseAmount => "releaseAmount",
        }
    }
}

impl TransactionCommand {
    pub fn action(self) -> &'static str {
        match self {
            TransactionCommand::Deposit => "DEPOSIT",
            TransactionCommand::Withdrawal => "WITHDRAWAL",
            TransactionCommand::PostInterestAsOn => "POSTINTERESTASON",
            TransactionCommand::HoldAmount => "HOLDAMOUNT",
            TransactionCommand::Undo => "UNDOTRANSACTION",
            TransactionCommand::Modify => "ADJUSTTRANSACTION",
            TransactionCommand::ReleaseAmount => "RELEASEAMOUNT",
        }
    }
}

pub const SAVINGS_TRANSACTION_COMMANDS: &[TransactionCommand] = &[
    TransactionCommand::Deposit,
    TransactionCommand::Withdrawal,
    TransactionCommand::PostInterestAsOn,
    TransactionCommand::HoldAmount,
];

pub const SAVINGS_TRANSACTION_ADJUST_COMMANDS: &[TransactionCommand] = &[
    TransactionCommand::Undo,
    TransactionCommand::Modify,
    TransactionCommand::ReleaseAmount,
];

pub const DEPOSIT_TRANSACTION_COMMANDS: &[TransactionCommand] =
    &[TransactionCommand::Deposit, TransactionCommand::Withdrawal];

pub const DEPOSIT_TRANSACTION_ADJUST_COMMANDS: &[TransactionCommand] =
    &[TransactionCommand::Undo, TransactionCommand::Modify];

// ---------------------------------------------------------------------------
// Account charge commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeCommand {
    PayCharge,
    Waive,
    Inactivate,
}

impl CommandName for ChargeCommand {
    fn name(self) -> &'static str {
        match self {
            ChargeCommand::PayCharge => "paycharge",
            ChargeCommand::Waive => "waive",
            ChargeCommand::Inactivate => "inactivate",
        }
    }
}

impl ChargeCommand {
    pub fn action(self) -> &'static str {
        match self {
            ChargeCommand::PayCharge => "PAY",
            ChargeCommand::Waive => "WAIVE",
            ChargeCommand::Inactivate => "INACTIVATE",
        }
    }
}

pub const ACCOUNT_CHARGE_COMMANDS: &[ChargeCommand] = &[
    ChargeCommand::PayCharge,
    ChargeCommand::Waive,
    ChargeCommand::Inactivate,
];

// ---------------------------------------------------------------------------
// chargeStatus filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatusFilter {
    All,
    Active,
    Inactive,
}

impl CommandName for ChargeStatusFilter {
    fn name(self) -> &'static str {
        match self {
            ChargeStatusFilter::All => "all",
            ChargeStatusFilter::Active => "active",
            ChargeStatusFilter::Inactive => "inactive",
        }
    }
}

impl ChargeStatusFilter {
    /// Parse `?chargeStatus=`; absent means `all`.
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        match raw {
            None => Ok(ChargeStatusFilter::All),
            Some(v) => parse_command(
                "status",
                Some(v),
                &[
                    ChargeStatusFilter::All,
                    ChargeStatusFilter::Active,
                    ChargeStatusFilter::Inactive,
                ],
            ),
        }
    }

    pub fn matches(self, active: bool) -> bool {
        match self {
            ChargeStatusFilter::All => true,
            ChargeStatusFilter::Active => active,
            ChargeStatusFilter::Inactive => !active,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_case_insensitively_after_trim() {
        let cmd = parse_command("command", Some("  APPROVE "), SAVINGS_ACCOUNT_COMMANDS).unwrap();
        assert_eq!(cmd, AccountCommand::Approve);

        let cmd = parse_command("command", Some("undoApproval"), SAVINGS_ACCOUNT_COMMANDS).unwrap();
        assert_eq!(cmd, AccountCommand::UndoApproval);
    }

    #[test]
    fn unknown_command_lists_allowed_values() {
        let err = parse_command("command", Some("explode"), SAVINGS_ACCOUNT_COMMANDS).unwrap_err();
        assert_matches!(
            err,
            CoreError::UnrecognizedQueryParam { ref param, ref value, ref allowed }
                if param == "command"
                    && value == "explode"
                    && allowed.len() == SAVINGS_ACCOUNT_COMMANDS.len()
                    && allowed.contains(&"unblockCredit".to_string())
        );
    }

    #[test]
    fn missing_command_is_unrecognized() {
        let err = parse_command("command", None, SAVINGS_TRANSACTION_COMMANDS).unwrap_err();
        assert_matches!(err, CoreError::UnrecognizedQueryParam { ref value, .. } if value.is_empty());

        let err = parse_command("command", Some("   "), SAVINGS_TRANSACTION_COMMANDS).unwrap_err();
        assert_matches!(err, CoreError::UnrecognizedQueryParam { .. });
    }

    #[test]
    fn savings_commands_reject_deposit_only_commands() {
        assert!(parse_command("command", Some("prematureClose"), SAVINGS_ACCOUNT_COMMANDS).is_err());
        assert!(
            parse_command("command", Some("prematureClose"), FIXED_DEPOSIT_ACCOUNT_COMMANDS).is_ok()
        );
        assert!(
            parse_command("command", Some("updateDepositAmount"), FIXED_DEPOSIT_ACCOUNT_COMMANDS)
                .is_err()
        );
        assert!(parse_command(
            "command",
            Some("updateDepositAmount"),
            RECURRING_DEPOSIT_ACCOUNT_COMMANDS
        )
        .is_ok());
    }

    #[test]
    fn charge_status_filter() {
        assert_eq!(ChargeStatusFilter::parse(None).unwrap(), ChargeStatusFilter::All);
        assert_eq!(
            ChargeStatusFilter::parse(Some("Inactive")).unwrap(),
            ChargeStatusFilter::Inactive
        );
        assert_matches!(
            ChargeStatusFilter::parse(Some("paid")),
            Err(CoreError::UnrecognizedQueryParam { ref param, .. }) if param == "status"
        );
        assert!(ChargeStatusFilter::Active.matches(true));
        assert!(!ChargeStatusFilter::Active.matches(false));
    }

    #[test]
    fn is_command_helper() {
        assert!(is_command(Some(" updateWithHoldTax"), "updatewithholdtax"));
        assert!(!is_command(None, "close"));
    }
}
