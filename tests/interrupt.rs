//! The process-wide interrupt ends a running batch at the next step.
//!
//! Kept in its own test binary: the interrupt counter is global.

use dactyl::fdtd::{interrupt_count, request_interrupt, StepBatch, TerminationReason};
use dactyl::prelude::*;

#[test]
fn test_interrupt_stops_batch() {
    let volume = Volume::new(1.0, 1.0, 10.0).unwrap();
    let mut f = Fields::from_material(&Material::new(volume, |_| 1.0), 0);
    f.initialize_with_nth_tm(1);

    let before = interrupt_count();
    let mut observer = |fields: &Fields| -> Option<String> {
        if fields.t() == 5 {
            request_interrupt();
        }
        None
    };
    let result = f.run_batch(StepBatch::steps(100), &mut observer);
    assert_eq!(result.termination_reason, TerminationReason::Interrupted);
    assert_eq!(result.timesteps_executed, 5);
    assert_eq!(interrupt_count(), before + 1);

    // A new batch starts from the current count and runs to completion.
    let result = f.run_batch(StepBatch::steps(10), &mut dactyl::fdtd::NoObserver);
    assert_eq!(result.termination_reason, TerminationReason::StepsCompleted);
    assert_eq!(f.t(), 15);
}
