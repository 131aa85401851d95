//! Device states and their severity.

use super::label_enum;
use super::LabelEnum;

label_enum! {
    /// Scheduling state of a device.
    pub enum DutState {
        Unknown => "unknown",
        Ready => "ready",
        NeedsRepair => "needs_repair",
        RepairFailed => "repair_failed",
        NeedsManualRepair => "needs_manual_repair",
        NeedsReplacement => "needs_replacement",
        NeedsDeploy => "needs_deploy",
        NeedsManualAttention => "needs_manual_attention",
        Reserved => "reserved",
    }
}

impl DutState {
    /// Severity used when several devices share one scheduling unit.
    pub fn weight(self) -> u8 {
        match self {
            DutState::Unknown => 0,
            DutState::Ready => 1,
            DutState::NeedsRepair => 2,
            DutState::RepairFailed => 3,
            DutState::NeedsManualRepair
            | DutState::NeedsReplacement
            | DutState::NeedsDeploy
            | DutState::NeedsManualAttention => 4,
            DutState::Reserved => 5,
        }
    }

    /// States that need a human collapse into `needs_manual_attention`.
    pub fn canonical(self) -> DutState {
        match self {
            DutState::NeedsManualRepair | DutState::NeedsReplacement | DutState::NeedsDeploy => {
                DutState::NeedsManualAttention
            }
            other => other,
        }
    }
}

/// The most severe of `states`, or `unknown` when there are none.
pub fn aggregate<I>(states: I) -> DutState
where
    I: IntoIterator<Item = DutState>,
{
    states
        .into_iter()
        .max_by_key(|state| state.weight())
        .map(DutState::canonical)
        .unwrap_or_default()
}

/// Parse a `dut_state` dimension value; unrecognized values count as unknown.
pub fn parse_state(text: &str) -> DutState {
    DutState::parse(text).unwrap_or_default()
}
