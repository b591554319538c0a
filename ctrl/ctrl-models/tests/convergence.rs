//! End-to-end solves on the benchmark problems.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::f64::consts::PI;

use ctrl_ddp::{DdpConfig, DdpProblem, DdpSolver};
use ctrl_models::{CartPole, LinearQuadratic, Pendulum};
use nalgebra::{DVector, dvector};

fn zero_inputs(horizon: usize) -> Vec<DVector<f64>> {
    vec![dvector![0.0]; horizon]
}

#[test]
fn double_integrator_reaches_target_at_rest() {
    let problem = LinearQuadratic::double_integrator(0.05, 2.0);
    let config = DdpConfig::with_horizon_steps(60);
    let mut solver = DdpSolver::new(problem, config).unwrap();

    let status = solver.solve(&dvector![0.0, 0.0], &zero_inputs(60)).unwrap();
    assert!(status.is_success());

    let terminal = solver.trajectory().terminal_state().unwrap();
    assert!(
        (terminal[0] - 2.0).abs() < 0.05,
        "position {} missed the target",
        terminal[0]
    );
    assert!(terminal[1].abs() < 0.1, "residual velocity {}", terminal[1]);
}

#[test]
fn pendulum_stabilizes_from_a_push() {
    let config = DdpConfig::with_horizon_steps(80);
    let mut solver = DdpSolver::new(Pendulum::default(), config).unwrap();

    let status = solver
        .solve(&dvector![PI - 0.3, 0.0], &zero_inputs(80))
        .unwrap();
    assert!(status.is_success());

    let terminal = solver.trajectory().terminal_state().unwrap();
    assert!(
        (terminal[0] - PI).abs() < 0.05,
        "final angle {} not upright",
        terminal[0]
    );
    assert!(
        terminal[1].abs() < 0.2,
        "residual angular velocity {}",
        terminal[1]
    );
}

#[test]
fn pendulum_swings_up_from_rest() {
    let config = DdpConfig::with_horizon_steps(150);
    let mut solver = DdpSolver::new(Pendulum::default(), config).unwrap();

    let status = solver
        .solve(&dvector![0.0, 0.0], &zero_inputs(150))
        .unwrap();
    assert!(status.is_success());

    let terminal = solver.trajectory().terminal_state().unwrap();
    assert!(
        (terminal[0] - PI).abs() < 0.1,
        "final angle {} not upright",
        terminal[0]
    );
}

#[test]
fn pendulum_full_ddp_uses_dynamics_curvature() {
    let config = DdpConfig::with_horizon_steps(80).with_second_order_dynamics();
    let mut solver = DdpSolver::new(Pendulum::default(), config).unwrap();

    let status = solver
        .solve(&dvector![PI - 0.3, 0.0], &zero_inputs(80))
        .unwrap();
    assert!(status.is_success());

    let terminal = solver.trajectory().terminal_state().unwrap();
    assert!((terminal[0] - PI).abs() < 0.05);
}

#[test]
fn cartpole_recovers_from_a_small_tilt() {
    let config = DdpConfig::with_horizon_steps(100);
    let mut solver = DdpSolver::new(CartPole::default(), config).unwrap();

    let status = solver
        .solve(&dvector![0.0, 0.0, 0.15, 0.0], &zero_inputs(100))
        .unwrap();
    assert!(status.is_success());

    let terminal = solver.trajectory().terminal_state().unwrap();
    assert!(
        terminal[2].abs() < 0.05,
        "final angle {} not balanced",
        terminal[2]
    );
    assert!(
        terminal[0].abs() < 1.0,
        "cart drifted to {}",
        terminal[0]
    );
}

#[test]
fn cartpole_swing_up_makes_progress() {
    let config = DdpConfig::with_horizon_steps(150);
    let mut solver = DdpSolver::new(CartPole::default(), config).unwrap();

    let inputs = zero_inputs(150);
    solver.solve(&dvector![0.0, 0.0, PI, 0.0], &inputs).unwrap();

    let trace = solver.trace();
    let initial_cost = trace[0].cost;
    let final_cost = solver.trajectory().total_cost();
    assert!(
        trace.iter().any(ctrl_ddp::TraceData::accepted),
        "at least one iteration must be accepted"
    );
    assert!(
        final_cost < initial_cost,
        "cost must improve: {initial_cost} -> {final_cost}"
    );
}

#[test]
fn tracking_gains_reject_a_disturbance() {
    // Solve the nominal problem, then roll the dynamics from a perturbed
    // start while applying the time-varying feedback law. The closed-loop
    // trajectory must end closer to upright than the open-loop one.
    let config = DdpConfig::with_horizon_steps(80);
    let mut solver = DdpSolver::new(Pendulum::default(), config).unwrap();
    let status = solver
        .solve(&dvector![PI - 0.3, 0.0], &zero_inputs(80))
        .unwrap();
    assert!(status.is_success());

    let pendulum = Pendulum::default();
    let reference = solver.trajectory();
    let gains = solver.gains();
    let disturbed = dvector![PI - 0.4, 0.0];

    let mut closed = disturbed.clone();
    let mut open = disturbed;
    for k in 0..reference.horizon() {
        let feedback = &gains.feedback[k] * (&closed - &reference.states[k]);
        let u = &reference.inputs[k] + feedback;
        closed = pendulum.state_eq(&closed, &u);
        open = pendulum.state_eq(&open, &reference.inputs[k]);
    }

    let closed_err = (closed[0] - PI).abs();
    let open_err = (open[0] - PI).abs();
    assert!(
        closed_err < open_err,
        "feedback must help: closed {closed_err} vs open {open_err}"
    );
    assert!(closed_err < 0.2, "closed-loop angle error {closed_err}");
}
