//! Linear consultation pipeline.
//!
//! One run is a fixed sequence of steps over a single mutable state: five
//! collectors, two reasoning steps, persistence. There is exactly one path;
//! the only conditional behavior (the validation retry) lives inside the
//! reasoning steps. No step failure aborts a run; the response shape is
//! guaranteed even when every input is missing.
mod collect;
mod extract;
mod fallback;
mod persist;
mod reason;

pub use fallback::{fallback_problems, RuleOutcome};
pub use reason::{run_reasoning, ReasoningStep, DETECT_PROBLEMS, PLAN_SOLUTIONS};

use crate::providers::Services;
use crate::state::ConsultationState;
use serde::Serialize;

/// Pipeline states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CollectConfig,
    CollectIot,
    CollectSatellite,
    CollectCarbon,
    CollectFlood,
    DetectProblems,
    PlanSolutions,
    Persist,
}

/// The single path through the pipeline.
pub const STEP_ORDER: [Step; 8] = [
    Step::CollectConfig,
    Step::CollectIot,
    Step::CollectSatellite,
    Step::CollectCarbon,
    Step::CollectFlood,
    Step::DetectProblems,
    Step::PlanSolutions,
    Step::Persist,
];

/// What a consultation run returns to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ConsultationOutcome {
    pub problems: Vec<String>,
    pub solutions: Vec<String>,
}

/// Run one consultation to completion.
pub fn run_consultation(
    services: &Services,
    farmer_id: &str,
    field_id: &str,
) -> ConsultationOutcome {
    let mut state = ConsultationState::new(farmer_id, field_id);
    tracing::info!(%farmer_id, %field_id, "consultation started");

    for step in STEP_ORDER {
        tracing::debug!(?step, "step");
        execute_step(services, step, &mut state);
    }

    tracing::info!(
        %farmer_id,
        %field_id,
        problems = state.problems.len(),
        solutions = state.solutions.len(),
        "consultation finished"
    );
    ConsultationOutcome {
        problems: state.problems,
        solutions: state.solutions,
    }
}

fn execute_step(services: &Services, step: Step, state: &mut ConsultationState) {
    match step {
        Step::CollectConfig => collect::collect_field_config(services, state),
        Step::CollectIot => collect::collect_iot(services, state),
        Step::CollectSatellite => collect::collect_satellite(services, state),
        Step::CollectCarbon => collect::collect_carbon(services, state),
        Step::CollectFlood => collect::collect_flood(services, state),
        Step::DetectProblems => detect_problems(services, state),
        Step::PlanSolutions => plan_solutions(services, state),
        Step::Persist => persist::persist_consultation(services, state),
    }
}

fn detect_problems(services: &Services, state: &mut ConsultationState) {
    let payload = state.problem_payload();
    match reason::run_reasoning(&*services.llm, &DETECT_PROBLEMS, &payload) {
        Some(problems) => state.problems = problems,
        None => {
            // Detected problems must never silently vanish.
            state.problems = fallback::fallback_problems(state);
            tracing::info!(
                problems = state.problems.len(),
                "problem detection fell back to rules"
            );
        }
    }
}

fn plan_solutions(services: &Services, state: &mut ConsultationState) {
    let payload = state.solution_payload();
    match reason::run_reasoning(&*services.llm, &PLAN_SOLUTIONS, &payload) {
        Some(solutions) => state.solutions = solutions,
        None => {
            // An empty solution list is an acceptable answer.
            state.solutions = Vec::new();
            tracing::info!("solution planning fell back to an empty list");
        }
    }
}
