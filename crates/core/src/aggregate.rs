use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::employee::EmployeeId;
use crate::domain::plan::{DecisionState, PlanStatus, ResolvedApprovalPlan};

/// One decision as recorded by the caller against the subject record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedDecision {
    pub employee_id: EmployeeId,
    pub state: DecisionState,
    pub decided_at: DateTime<Utc>,
    pub remarks: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecisionError {
    #[error("employee `{employee_id}` holds no pending slot in the current approval step")]
    IneligibleDecider { employee_id: String },
    #[error("slot for employee `{employee_id}` is already decided as {state:?}")]
    StaleDecision {
        employee_id: String,
        state: DecisionState,
        decided_by: Option<EmployeeId>,
        decided_at: Option<DateTime<Utc>>,
    },
    #[error("request is already {status:?}; no further decisions are accepted")]
    RequestClosed { status: PlanStatus },
}

/// Merge recorded decisions into a plan's slots.
///
/// Decisions are applied in (timestamp, employee id) order so conflicting
/// submissions resolve deterministically: the earliest wins, identical
/// timestamps fall back to the lowest employee id. Each decision fulfills at
/// most one slot (the first pending slot, in step order, that accepts the
/// employee); decisions that match nothing are ignored as stale approver
/// records. Out-of-order decisions for later steps are stored but only
/// `overall_status` decides whether they count yet.
pub fn merge_decisions(
    plan: &ResolvedApprovalPlan,
    decisions: &[RecordedDecision],
) -> ResolvedApprovalPlan {
    let mut merged = plan.clone();
    let mut ordered: Vec<&RecordedDecision> =
        decisions.iter().filter(|decision| decision.state != DecisionState::Pending).collect();
    ordered.sort_by(|left, right| {
        left.decided_at
            .cmp(&right.decided_at)
            .then_with(|| left.employee_id.cmp(&right.employee_id))
    });

    for decision in ordered {
        apply_to_first_matching_slot(&mut merged, decision);
    }

    merged.status = overall_status(&merged);
    merged
}

/// Derive the overall status from a merged plan.
///
/// Steps gate in order: a decline inside the first not-fully-approved step is
/// terminal, an incomplete step keeps the plan pending regardless of what
/// later steps already recorded, and the plan is approved only once every
/// step is fully approved. Auto-approved plans stay auto-approved.
pub fn overall_status(plan: &ResolvedApprovalPlan) -> PlanStatus {
    if plan.status == PlanStatus::AutoApproved {
        return PlanStatus::AutoApproved;
    }
    if plan.steps.is_empty() {
        return plan.status;
    }

    for step in &plan.steps {
        if step.has_decline() {
            return PlanStatus::Declined;
        }
        if !step.is_fully_approved() {
            return PlanStatus::Pending;
        }
    }

    PlanStatus::Approved
}

/// `aggregate(plan, decisions) -> OverallStatus`; a pure function of its
/// inputs, so re-aggregating the same decision set always yields the same
/// answer.
pub fn aggregate(plan: &ResolvedApprovalPlan, decisions: &[RecordedDecision]) -> PlanStatus {
    merge_decisions(plan, decisions).status
}

/// Validate and apply a single decision against a merged plan.
///
/// Unlike `merge_decisions`, this is the strict gate used when accepting a
/// new submission: the decider must occupy a pending slot of the current
/// step, an already-fulfilled slot is rejected idempotently with its current
/// state, and a terminal plan accepts nothing further.
pub fn record_decision(
    plan: &mut ResolvedApprovalPlan,
    decision: &RecordedDecision,
) -> Result<(), DecisionError> {
    let status = overall_status(plan);
    if status.is_terminal() {
        return Err(stale_or_closed(plan, &decision.employee_id, status));
    }

    let current_order = plan
        .current_step()
        .map(|step| step.order_number)
        .ok_or(DecisionError::RequestClosed { status })?;
    let step_index = plan
        .steps
        .iter()
        .position(|step| step.order_number == current_order)
        .ok_or(DecisionError::RequestClosed { status })?;

    let pending_slot = plan.steps[step_index]
        .slots
        .iter()
        .position(|slot| slot.is_pending() && slot.requirement.accepts(&decision.employee_id));

    if let Some(slot_index) = pending_slot {
        let slot = &mut plan.steps[step_index].slots[slot_index];
        slot.state = decision.state;
        slot.decided_by = Some(decision.employee_id.clone());
        slot.decided_at = Some(decision.decided_at);
        slot.remarks = decision.remarks.clone();
        plan.status = overall_status(plan);
        return Ok(());
    }

    // No pending match; a decided slot for this employee means the submission
    // is a replay, anything else means they are not gating this step.
    if let Some(slot) = plan.steps[step_index]
        .slots
        .iter()
        .find(|slot| slot.requirement.accepts(&decision.employee_id))
    {
        return Err(DecisionError::StaleDecision {
            employee_id: decision.employee_id.0.clone(),
            state: slot.state,
            decided_by: slot.decided_by.clone(),
            decided_at: slot.decided_at,
        });
    }

    Err(DecisionError::IneligibleDecider { employee_id: decision.employee_id.0.clone() })
}

fn apply_to_first_matching_slot(plan: &mut ResolvedApprovalPlan, decision: &RecordedDecision) {
    for step in &mut plan.steps {
        for slot in &mut step.slots {
            if slot.is_pending() && slot.requirement.accepts(&decision.employee_id) {
                slot.state = decision.state;
                slot.decided_by = Some(decision.employee_id.clone());
                slot.decided_at = Some(decision.decided_at);
                slot.remarks = decision.remarks.clone();
                return;
            }
        }
    }
}

fn stale_or_closed(
    plan: &ResolvedApprovalPlan,
    employee_id: &EmployeeId,
    status: PlanStatus,
) -> DecisionError {
    let decided_slot = plan
        .steps
        .iter()
        .flat_map(|step| step.slots.iter())
        .find(|slot| slot.requirement.accepts(employee_id) && !slot.is_pending());

    match decided_slot {
        Some(slot) => DecisionError::StaleDecision {
            employee_id: employee_id.0.clone(),
            state: slot.state,
            decided_by: slot.decided_by.clone(),
            decided_at: slot.decided_at,
        },
        None => DecisionError::RequestClosed { status },
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::aggregate::{
        aggregate, merge_decisions, record_decision, DecisionError, RecordedDecision,
    };
    use crate::domain::employee::{EmployeeId, JobId};
    use crate::domain::plan::{
        ApprovalSlot, ApprovalStep, ApproverRef, DecisionState, PlanStatus, ResolvedApprovalPlan,
        SlotRequirement,
    };
    use crate::domain::signatory::SignatoryPath;

    fn approver(id: &str, job: &str) -> ApproverRef {
        ApproverRef {
            employee_id: EmployeeId(id.to_owned()),
            full_name: format!("Employee {id}"),
            job_id: JobId(job.to_owned()),
        }
    }

    /// Step 1: direct manager (any-of, one eligible); step 2: HR (applies to
    /// all, two eligible employees).
    fn leave_request_plan() -> ResolvedApprovalPlan {
        ResolvedApprovalPlan {
            path: SignatoryPath("leave-request".to_owned()),
            applicant_id: EmployeeId("E-100".to_owned()),
            applicant: None,
            steps: vec![
                ApprovalStep {
                    order_number: 1,
                    slots: vec![ApprovalSlot::new(
                        "Recommending Approval",
                        SlotRequirement::AnyOf {
                            eligible: vec![approver("E-200", "dept-manager")],
                        },
                    )],
                },
                ApprovalStep {
                    order_number: 2,
                    slots: vec![
                        ApprovalSlot::new(
                            "Final Approval",
                            SlotRequirement::Exactly {
                                approver: approver("E-301", "hr-officer"),
                            },
                        ),
                        ApprovalSlot::new(
                            "Final Approval",
                            SlotRequirement::Exactly {
                                approver: approver("E-302", "hr-officer"),
                            },
                        ),
                    ],
                },
            ],
            status: PlanStatus::Pending,
        }
    }

    fn decision(id: &str, state: DecisionState, minute: u32) -> RecordedDecision {
        RecordedDecision {
            employee_id: EmployeeId(id.to_owned()),
            state,
            decided_at: Utc.with_ymd_and_hms(2026, 3, 4, 9, minute, 0).single().expect("timestamp"),
            remarks: None,
        }
    }

    #[test]
    fn plan_stays_pending_until_every_hr_slot_is_approved() {
        let plan = leave_request_plan();

        let partial = [
            decision("E-200", DecisionState::Approved, 0),
            decision("E-301", DecisionState::Approved, 5),
        ];
        assert_eq!(aggregate(&plan, &partial), PlanStatus::Pending);

        let complete = [
            decision("E-200", DecisionState::Approved, 0),
            decision("E-301", DecisionState::Approved, 5),
            decision("E-302", DecisionState::Approved, 9),
        ];
        assert_eq!(aggregate(&plan, &complete), PlanStatus::Approved);
    }

    #[test]
    fn single_decline_in_applies_to_all_step_is_terminal() {
        let plan = leave_request_plan();
        let decisions = [
            decision("E-200", DecisionState::Approved, 0),
            decision("E-301", DecisionState::Declined, 5),
            decision("E-302", DecisionState::Approved, 9),
        ];

        assert_eq!(aggregate(&plan, &decisions), PlanStatus::Declined);
    }

    #[test]
    fn later_step_decisions_do_not_advance_a_gated_plan() {
        let plan = leave_request_plan();
        let decisions = [
            decision("E-301", DecisionState::Approved, 1),
            decision("E-302", DecisionState::Approved, 2),
        ];

        let merged = merge_decisions(&plan, &decisions);
        assert_eq!(merged.status, PlanStatus::Pending);
        // Stored for audit display even though the gate has not reached them.
        assert!(merged.steps[1].is_fully_approved());
    }

    #[test]
    fn earliest_decision_wins_any_of_conflicts() {
        let mut plan = leave_request_plan();
        plan.steps[0].slots[0].requirement = SlotRequirement::AnyOf {
            eligible: vec![approver("E-200", "dept-manager"), approver("E-201", "dept-manager")],
        };

        let decisions = [
            decision("E-201", DecisionState::Declined, 3),
            decision("E-200", DecisionState::Approved, 1),
        ];

        let merged = merge_decisions(&plan, &decisions);
        assert_eq!(merged.steps[0].slots[0].decided_by, Some(EmployeeId("E-200".to_owned())));
        assert_eq!(merged.steps[0].slots[0].state, DecisionState::Approved);
    }

    #[test]
    fn identical_timestamps_resolve_by_lowest_employee_id() {
        let mut plan = leave_request_plan();
        plan.steps[0].slots[0].requirement = SlotRequirement::AnyOf {
            eligible: vec![approver("E-200", "dept-manager"), approver("E-201", "dept-manager")],
        };

        let decisions = [
            decision("E-201", DecisionState::Declined, 4),
            decision("E-200", DecisionState::Approved, 4),
        ];

        let merged = merge_decisions(&plan, &decisions);
        assert_eq!(merged.steps[0].slots[0].decided_by, Some(EmployeeId("E-200".to_owned())));
    }

    #[test]
    fn aggregation_is_idempotent_for_the_same_decision_set() {
        let plan = leave_request_plan();
        let decisions = [
            decision("E-200", DecisionState::Approved, 0),
            decision("E-301", DecisionState::Declined, 5),
        ];

        let first = aggregate(&plan, &decisions);
        let second = aggregate(&plan, &decisions);
        assert_eq!(first, second);
        assert_eq!(first, PlanStatus::Declined);
    }

    #[test]
    fn decisions_from_unknown_employees_are_ignored() {
        let plan = leave_request_plan();
        let decisions = [decision("E-999", DecisionState::Declined, 0)];

        let merged = merge_decisions(&plan, &decisions);
        assert_eq!(merged.status, PlanStatus::Pending);
        assert!(merged.steps.iter().all(|step| step
            .slots
            .iter()
            .all(|slot| slot.is_pending())));
    }

    #[test]
    fn decline_then_late_approval_does_not_reopen_the_plan() {
        let mut plan = leave_request_plan();
        record_decision(&mut plan, &decision("E-200", DecisionState::Approved, 0))
            .expect("manager approves");
        record_decision(&mut plan, &decision("E-301", DecisionState::Declined, 5))
            .expect("first HR declines");
        assert_eq!(plan.status, PlanStatus::Declined);

        let error = record_decision(&mut plan, &decision("E-302", DecisionState::Approved, 9))
            .expect_err("late approval must be rejected");
        assert_eq!(error, DecisionError::RequestClosed { status: PlanStatus::Declined });
        assert_eq!(plan.status, PlanStatus::Declined);
    }

    #[test]
    fn recording_rejects_deciders_outside_the_current_step() {
        let mut plan = leave_request_plan();
        let error = record_decision(&mut plan, &decision("E-301", DecisionState::Approved, 0))
            .expect_err("HR cannot decide before the manager");

        assert_eq!(
            error,
            DecisionError::IneligibleDecider { employee_id: "E-301".to_owned() }
        );
    }

    #[test]
    fn recording_rejects_fulfilled_slots_idempotently() {
        let mut plan = leave_request_plan();
        let first = decision("E-200", DecisionState::Approved, 0);
        record_decision(&mut plan, &first).expect("first decision lands");

        let mut replay = decision("E-200", DecisionState::Declined, 2);
        replay.remarks = Some("changed my mind".to_owned());
        let error =
            record_decision(&mut plan, &replay).expect_err("replayed decision is stale");

        match error {
            DecisionError::StaleDecision { employee_id, state, decided_by, decided_at } => {
                assert_eq!(employee_id, "E-200");
                assert_eq!(state, DecisionState::Approved);
                assert_eq!(decided_by, Some(EmployeeId("E-200".to_owned())));
                assert_eq!(decided_at, Some(first.decided_at));
            }
            other => panic!("expected stale decision, got {other:?}"),
        }
        // The earlier decision is untouched.
        assert_eq!(plan.steps[0].slots[0].state, DecisionState::Approved);
    }

    #[test]
    fn full_happy_path_reaches_approved() {
        let mut plan = leave_request_plan();
        for (id, minute) in [("E-200", 0), ("E-301", 5), ("E-302", 9)] {
            record_decision(&mut plan, &decision(id, DecisionState::Approved, minute))
                .expect("decision accepted");
        }
        assert_eq!(plan.status, PlanStatus::Approved);
    }

    #[test]
    fn merged_plan_round_trips_through_persisted_payload() {
        let plan = leave_request_plan();
        let merged = merge_decisions(
            &plan,
            &[
                decision("E-200", DecisionState::Approved, 0),
                decision("E-301", DecisionState::Approved, 5),
            ],
        );

        let payload = serde_json::to_string(&merged).expect("serialize merged plan");
        let restored: ResolvedApprovalPlan =
            serde_json::from_str(&payload).expect("deserialize merged plan");

        assert_eq!(restored, merged);
        assert_eq!(aggregate(&restored, &[]), merged.status);
    }

    #[test]
    fn recording_after_terminal_approval_reports_stale_for_own_slot() {
        let mut plan = leave_request_plan();
        for (id, minute) in [("E-200", 0), ("E-301", 5), ("E-302", 9)] {
            record_decision(&mut plan, &decision(id, DecisionState::Approved, minute))
                .expect("decision accepted");
        }

        let replay = RecordedDecision {
            employee_id: EmployeeId("E-302".to_owned()),
            state: DecisionState::Approved,
            decided_at: Utc.with_ymd_and_hms(2026, 3, 4, 9, 9, 0).single().expect("timestamp")
                + Duration::minutes(30),
            remarks: None,
        };
        let error = record_decision(&mut plan, &replay).expect_err("plan is closed");
        assert!(matches!(error, DecisionError::StaleDecision { .. }));
    }
}
